//! Generator, envelope and voice lifecycles against the offline provider.

use rand::{rngs::StdRng, SeedableRng};
use saavy_poly::{
    graph::{NoiseSource, NoiseType, Restartable, TripleShapeOscillator},
    io::OfflineProvider,
    settings::{AdsrParams, SynthConfig},
    synth::{PolySynth, SynthVoice, VoiceState},
    voices::{AnalogVoice, SimpleVoice},
    Note, SignalNodeProvider,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn note(name: &str) -> Note {
    name.parse().expect("valid note name")
}

fn simple_voice(ctx: &mut OfflineProvider, amp: AdsrParams) -> SynthVoice<SimpleVoice> {
    let graph = SimpleVoice::new(ctx).expect("graph");
    SynthVoice::new(ctx, graph, amp).expect("voice")
}

fn seeded_noise(ctx: &mut OfflineProvider, seed: u64) -> Restartable<NoiseSource> {
    let mut rng = StdRng::seed_from_u64(seed);
    Restartable::new(NoiseSource::with_rng(ctx, NoiseType::White, 256, &mut rng))
}

#[test]
fn voice_walks_attack_release_free() {
    init_logging();
    let mut ctx = OfflineProvider::new();
    let mut voice = simple_voice(&mut ctx, AdsrParams::new(0.01, 0.1, 0.7, 1.0));

    voice.trigger_attack(&mut ctx, note("E4")).expect("attack");
    assert_eq!(voice.check_and_update_state(0.25), VoiceState::InAttackPhase);

    ctx.advance_to(0.5);
    voice.trigger_release(&mut ctx).expect("release");

    for t in [0.5001, 1.0, 1.4999, 1.5] {
        assert_eq!(voice.check_and_update_state(t), VoiceState::InReleasePhase, "t = {t}");
    }
    assert_eq!(voice.check_and_update_state(1.5001), VoiceState::Free);
    assert_eq!(voice.note(), None);
    assert_eq!(voice.release_finish_time(), None);
}

#[test]
fn release_finish_does_not_depend_on_hold_time() {
    init_logging();
    let amp = AdsrParams::new(0.01, 0.2, 0.5, 0.75);

    for held in [0.25, 0.8, 3.0] {
        let mut ctx = OfflineProvider::new();
        let mut voice = simple_voice(&mut ctx, amp);
        voice.trigger_attack(&mut ctx, note("C3")).expect("attack");
        ctx.advance_to(held);
        voice.trigger_release(&mut ctx).expect("release");

        let finish = voice.release_finish_time().expect("releasing");
        assert!((finish - (held + amp.release)).abs() < 1e-9, "held {held}");
    }
}

#[test]
fn retrigger_during_release_starts_from_the_current_level() {
    init_logging();
    let mut ctx = OfflineProvider::new();
    let mut voice = simple_voice(&mut ctx, AdsrParams::new(0.05, 0.1, 0.8, 1.0));

    voice.trigger_attack(&mut ctx, note("A4")).expect("attack");
    ctx.advance_to(0.5);
    voice.trigger_release(&mut ctx).expect("release");
    ctx.advance_to(0.9);
    let falling = voice.envelope().level_at(&ctx, 0.9).expect("level");
    assert!(falling > 0.0 && falling < 0.8);

    voice.trigger_attack(&mut ctx, note("A4")).expect("retrigger");

    let held = voice.envelope().level_at(&ctx, 0.9).expect("level");
    assert!((held - falling).abs() < 1e-6);
    assert_eq!(voice.state(), VoiceState::InAttackPhase);
    let peak = voice.envelope().timeline().attack_end_time;
    assert_eq!(voice.envelope().level_at(&ctx, peak), Some(1.0));
}

#[test]
fn drained_generation_is_torn_down_once() {
    init_logging();
    let mut ctx = OfflineProvider::new();
    let osc = TripleShapeOscillator::new(&mut ctx).expect("oscillator");
    let mut source = Restartable::new(osc);
    let baseline = ctx.node_count();

    source.start_source(&mut ctx, 0.0).expect("start");
    assert!(ctx.node_count() > baseline);
    source.stop_source(&mut ctx, 0.2).expect("stop");
    ctx.advance_to(0.3);

    let mut notices = ctx.take_ended();
    assert_eq!(notices.len(), 3);
    notices.reverse();

    for notice in &notices[..2] {
        assert!(source.handle_ended(&mut ctx, notice).expect("ended"));
        assert_eq!(source.draining_count(), 1);
    }
    assert!(source.handle_ended(&mut ctx, &notices[2]).expect("ended"));
    assert_eq!(source.draining_count(), 0);
    assert_eq!(ctx.node_count(), baseline);

    // late duplicates are recognised and ignored
    for notice in &notices {
        assert!(source.handle_ended(&mut ctx, notice).expect("stale notice"));
    }
    assert_eq!(ctx.node_count(), baseline);
}

#[test]
fn notices_only_reach_their_own_generator() {
    init_logging();
    let mut ctx = OfflineProvider::new();
    let mut white = seeded_noise(&mut ctx, 1);
    let mut other = seeded_noise(&mut ctx, 2);

    white.start_source(&mut ctx, 0.0).expect("start");
    white.stop_source(&mut ctx, 0.1).expect("stop");
    ctx.advance_to(0.1);

    let notices = ctx.take_ended();
    assert_eq!(notices.len(), 1);
    assert!(!other.handle_ended(&mut ctx, &notices[0]).expect("foreign"));
    assert_eq!(white.draining_count(), 1);
    assert!(white.handle_ended(&mut ctx, &notices[0]).expect("own"));
    assert_eq!(white.draining_count(), 0);
}

#[test]
fn restarting_cuts_the_draining_generation() {
    init_logging();
    let mut ctx = OfflineProvider::new();
    let mut source = Restartable::new(TripleShapeOscillator::new(&mut ctx).expect("oscillator"));

    source.start_source(&mut ctx, 0.0).expect("start");
    let first = source.generator().live_nodes().expect("running");
    source.stop_source(&mut ctx, 2.0).expect("long stop");

    ctx.advance_to(0.25);
    source.start_source(&mut ctx, 0.25).expect("restart");
    let second = source.generator().live_nodes().expect("running");

    assert_ne!(first, second);
    for node in first {
        assert!(!ctx.is_playing(node, 0.25));
    }
    for node in second {
        assert!(ctx.is_playing(node, 0.25));
    }

    ctx.advance_to(0.3);
    for notice in ctx.take_ended() {
        source.handle_ended(&mut ctx, &notice).expect("ended");
    }
    assert!(first.iter().all(|&node| !ctx.contains(node)));
    assert!(source.is_running());
    assert_eq!(source.draining_count(), 0);
}

#[test]
fn teardown_with_pending_notices_is_silent() {
    init_logging();
    let mut ctx = OfflineProvider::new();
    let mut source = seeded_noise(&mut ctx, 3);

    source.start_source(&mut ctx, 0.0).expect("start");
    source.stop_source(&mut ctx, 0.5).expect("stop");
    source.teardown(&mut ctx).expect("teardown");

    ctx.advance_to(1.0);
    assert!(ctx.take_ended().is_empty());
    assert_eq!(ctx.node_count(), 0);
    assert_eq!(ctx.link_count(), 0);
}

#[test]
fn finished_voices_leave_only_persistent_nodes() {
    init_logging();
    let config = SynthConfig {
        voice_count: 4,
        amp_envelope: AdsrParams::new(0.01, 0.1, 0.6, 0.25),
    };
    let mut synth =
        PolySynth::with_config(OfflineProvider::new(), AnalogVoice::factory(), config).expect("pool");
    let idle = synth.provider().node_count();

    let phrase = ["C4", "E4", "G4", "C5", "E5", "G5", "C4", "B4"];
    for (i, name) in phrase.into_iter().enumerate() {
        synth.advance_to(i as f64 * 0.1);
        synth.trigger_attack(note(name));
        if i % 2 == 1 {
            synth.trigger_release(note(phrase[i - 1]));
        }
    }
    synth.release_all();
    synth.advance_by(config.amp_envelope.release + 0.1);

    assert!(synth.voice_states().iter().all(|&s| s == VoiceState::Free));
    assert_eq!(synth.provider().node_count(), idle);
}

#[test]
fn voice_teardown_disposes_everything() {
    init_logging();
    let mut ctx = OfflineProvider::new();
    let graph = AnalogVoice::new(&mut ctx).expect("graph");
    let mut voice = SynthVoice::new(&mut ctx, graph, AdsrParams::voice()).expect("voice");

    voice.trigger_attack(&mut ctx, note("D3")).expect("attack");
    ctx.advance_to(0.3);
    voice.trigger_release(&mut ctx).expect("release");
    voice.teardown(&mut ctx).expect("teardown");

    assert_eq!(ctx.node_count(), 0);
    assert_eq!(ctx.link_count(), 0);
    ctx.advance_to(5.0);
    assert!(ctx.take_ended().is_empty());
    assert_eq!(ctx.current_time(), 5.0);
}

#[test]
fn long_sessions_keep_automation_small() {
    init_logging();
    let config = SynthConfig {
        voice_count: 1,
        amp_envelope: AdsrParams::new(0.001, 0.002, 0.5, 0.03),
    };
    let mut synth =
        PolySynth::with_config(OfflineProvider::new(), AnalogVoice::factory(), config).expect("pool");
    let c4 = note("C4");

    for step in 0..5_000 {
        synth.advance_to(step as f64 * 0.01);
        if step % 2 == 0 {
            synth.trigger_attack(c4);
        } else {
            synth.trigger_release(c4);
        }
    }

    let voice = &synth.voices()[0];
    let amp = voice.envelope().level_param();
    let filter = voice.graph().filter().envelope().level_param();
    for param in [amp, filter] {
        let events = synth.provider().automation_len(param).expect("envelope level");
        assert!(events <= 4, "{events} automation events after 5000 triggers");
    }
}
