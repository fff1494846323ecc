//! saavy-poly - scripted polyphony demo
//!
//! Plays a short chord-and-melody script on a pool of analog voices against
//! the offline provider and prints the voice table after every event.
//!
//! Run with: cargo run -- [voice count]
//! Set RUST_LOG=debug to see every allocation decision.

mod script;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use rtrb::RingBuffer;

use saavy_poly::{
    io::OfflineProvider,
    settings::SynthConfig,
    synth::{PolySynth, SynthMessage, VoiceFactory, VoiceState},
    voices::AnalogVoice,
};

use script::Event;

const DEFAULT_VOICES: usize = 4;
const TAIL_SECONDS: f64 = 2.0;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let voice_count = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .wrap_err_with(|| format!("voice count must be a whole number, got '{arg}'"))?,
        None => DEFAULT_VOICES,
    };

    let config = SynthConfig {
        voice_count,
        ..SynthConfig::default()
    };
    let mut synth = PolySynth::with_config(OfflineProvider::new(), AnalogVoice::factory(), config)
        .wrap_err("could not build the voice pool")?;

    // a brighter, plucked filter
    synth.set_cutoff_frequency(1800.0);
    synth.set_filter_envelope_amount(2400.0);
    synth.set_filter_decay_duration(0.4);
    synth.set_filter_sustain_level(0.2);
    synth.set_cents_offset(AnalogVoice::OSC2, 7.0);

    let events = script::chord_and_steal()?;
    let end = events.last().map_or(0.0, |e| e.at) + TAIL_SECONDS;

    // control messages travel through the same queue a realtime host would use
    let (mut tx, mut rx) = RingBuffer::<SynthMessage>::new(events.len().max(1));

    for event in &events {
        synth.advance_to(event.at);
        tx.push(event.message)
            .map_err(|_| eyre!("control queue is full"))?;
        synth.process_messages(&mut rx);
        print_pool(&mut synth, event);
    }

    synth.advance_to(end);
    println!("t={end:>5.2}  (end)");
    print_voices(&mut synth);
    println!(
        "{} provider nodes alive after the tail",
        synth.provider().node_count()
    );
    Ok(())
}

fn print_pool<F: VoiceFactory>(synth: &mut PolySynth<F, OfflineProvider>, event: &Event) {
    println!("t={:>5.2}  {:?}", event.at, event.message);
    print_voices(synth);
}

fn print_voices<F: VoiceFactory>(synth: &mut PolySynth<F, OfflineProvider>) {
    let states = synth.voice_states();
    for (index, (voice, state)) in synth.voices().iter().zip(states).enumerate() {
        let note = voice.note().map_or_else(|| "-".to_string(), |n| n.to_string());
        let phase = match state {
            VoiceState::Free => "free",
            VoiceState::InAttackPhase => "attack",
            VoiceState::InReleasePhase => "release",
        };
        println!("         voice {index}: {phase:<8} {note}");
    }
}
