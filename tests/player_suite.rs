mod support;

use pixelfade::canvas::{Canvas, Rgb};
use pixelfade::clip::Clip;
use pixelfade::config::{PlayOrder, RepeatPolicy};
use pixelfade::player::{
    fade_alpha, Player, PlayerSettings, PlayerStatus, StallDetector, Transition,
};
use pixelfade::playlist::{Selector, SelectorSettings};
use pixelfade::provider::{OnDemandProvider, PoolProvider};
use support::{color_for, FakeClip, FakeFile, FakeLoader};

const DT: f32 = 1.0 / 60.0;

fn settings() -> PlayerSettings {
    PlayerSettings {
        fade_time: 2.0,
        epsilon: 0.001,
    }
}

fn seeded(order: PlayOrder) -> Selector {
    Selector::new(SelectorSettings {
        order,
        repeat_policy: RepeatPolicy::Identity,
        min_duration: 0.0,
        seed: Some(7),
    })
}

fn on_demand_player(count: usize, duration: f32) -> (Player<OnDemandProvider<FakeLoader>>, FakeLoader) {
    let (source, loader) = FakeLoader::uniform(count, duration);
    let provider = OnDemandProvider::new(source, loader.clone());
    let player = Player::new(provider, seeded(PlayOrder::Sequential), settings())
        .expect("first clip should load");
    (player, loader)
}

fn pool_player(clips: &[FakeClip], order: PlayOrder) -> Player<PoolProvider> {
    let provider = PoolProvider::from_clips(
        clips
            .iter()
            .cloned()
            .map(|c| Box::new(c) as Box<dyn Clip>)
            .collect(),
    );
    Player::new(provider, seeded(order), settings()).expect("first clip")
}

fn tick<P: pixelfade::provider::ClipProvider>(player: &mut Player<P>, canvas: &mut Canvas) -> Transition {
    player.update(DT);
    canvas.clear(Rgb::BLACK);
    player.draw(canvas)
}

#[test]
fn starts_single_with_unpaused_clip_at_start() {
    let (player, loader) = on_demand_player(3, 10.0);
    assert!(!player.is_fading());
    assert!(player.next().is_none());
    let clip = loader.last().expect("one clip loaded");
    assert!(!clip.state().paused);
    assert_eq!(clip.state().position, 0.0);
    assert_eq!(player.current().source_index(), 0);
}

#[test]
fn current_is_never_empty_over_many_transitions() {
    let (mut player, loader) = on_demand_player(3, 5.0);
    let mut canvas = Canvas::new(40, 10);
    let mut swaps = 0;
    for _ in 0..(60 * 40) {
        if tick(&mut player, &mut canvas) == Transition::Swapped {
            swaps += 1;
        }
        assert!(player.current().clip().is_loaded());
        assert!(!player.current().clip().is_paused());
    }
    assert!(swaps >= 7, "expected steady clip turnover, got {swaps} swaps");

    // Every superseded clip was closed; the ones on deck were not.
    let instances = loader.instances();
    let closed = instances.iter().filter(|c| c.state().closed).count();
    assert_eq!(closed, swaps);
    let open = instances.len() - closed;
    assert_eq!(open, if player.is_fading() { 2 } else { 1 });
}

#[test]
fn fade_starts_inside_window_and_swaps_at_end() {
    let (mut player, loader) = on_demand_player(2, 10.0);
    let mut canvas = Canvas::new(40, 10);
    let first = loader.last().expect("first clip");

    first.state_mut().position = 0.85;
    assert_eq!(tick(&mut player, &mut canvas), Transition::FadeStarted);
    assert!(player.is_fading());
    assert_eq!(player.next().map(|n| n.source_index()), Some(1));

    let mut swapped_after = None;
    for i in 0..200 {
        if tick(&mut player, &mut canvas) == Transition::Swapped {
            swapped_after = Some(i);
            break;
        }
    }
    let ticks = swapped_after.expect("clip should finish");
    // ~1.5s of remaining playback at 60 ticks per second.
    assert!((80..=100).contains(&ticks), "swapped after {ticks} ticks");
    assert!(first.state().closed);
    assert!(!player.is_fading());
    assert_eq!(player.current().source_index(), 1);
}

#[test]
fn not_playing_at_startup_does_not_swap_without_next() {
    let (mut player, loader) = on_demand_player(2, 10.0);
    let mut canvas = Canvas::new(40, 10);
    loader.last().expect("clip").state_mut().playing = false;
    for _ in 0..5 {
        assert_eq!(player.draw(&mut canvas), Transition::Steady);
    }
    assert_eq!(player.current().source_index(), 0);
}

#[test]
fn stall_detector_trips_on_third_flat_sample() {
    let mut stall = StallDetector::new();
    let trips: Vec<bool> = [2.0f32, 2.0, 2.0, 2.0]
        .iter()
        .map(|&t| stall.observe(t, 0.001))
        .collect();
    assert_eq!(trips, vec![false, false, true, true]);
}

#[test]
fn stall_detector_ignores_normal_progress_and_rewinds() {
    let mut stall = StallDetector::new();
    let mut t = 2.0f32;
    for _ in 0..60 {
        assert!(!stall.observe(t, 0.001));
        t -= DT;
    }

    // Time left growing (a seek backwards) gives a negative average.
    let mut stall = StallDetector::new();
    for t in [1.0f32, 1.5, 2.0, 2.5] {
        assert!(!stall.observe(t, 0.001));
    }
    assert!(stall.stuck_progress().expect("seeded") < 0.0);
}

#[test]
fn stalled_clip_is_swapped_within_a_few_ticks() {
    let (mut player, loader) = on_demand_player(2, 10.0);
    let mut canvas = Canvas::new(40, 10);
    let first = loader.last().expect("first clip");
    first.state_mut().position = 0.85;
    assert_eq!(tick(&mut player, &mut canvas), Transition::FadeStarted);

    first.state_mut().frozen = true;
    assert_eq!(tick(&mut player, &mut canvas), Transition::Steady);
    assert_eq!(tick(&mut player, &mut canvas), Transition::Steady);
    assert_eq!(tick(&mut player, &mut canvas), Transition::Swapped);
    assert!(first.state().closed);
}

#[test]
fn non_finite_time_left_finishes_a_fading_clip() {
    let (mut player, loader) = on_demand_player(2, 10.0);
    let mut canvas = Canvas::new(40, 10);
    let first = loader.last().expect("first clip");
    first.state_mut().position = 0.9;
    assert_eq!(tick(&mut player, &mut canvas), Transition::FadeStarted);

    first.state_mut().position = f32::NEG_INFINITY;
    assert_eq!(player.draw(&mut canvas), Transition::Swapped);
}

#[test]
fn fade_alpha_ramps_from_zero_to_opaque() {
    assert_eq!(fade_alpha(2.0, 2.0), 0);
    assert_eq!(fade_alpha(0.0, 2.0), 255);
    assert_eq!(fade_alpha(-0.5, 2.0), 255);
    assert_eq!(fade_alpha(f32::NAN, 2.0), 255);

    let mut prev = 0u8;
    let mut t = 2.0f32;
    while t >= 0.0 {
        let a = fade_alpha(t, 2.0);
        assert!(a >= prev, "alpha dropped from {prev} to {a} at {t}");
        prev = a;
        t -= 0.01;
    }
}

#[test]
fn next_clip_is_blended_over_current() {
    let (mut player, loader) = on_demand_player(2, 10.0);
    let mut canvas = Canvas::new(4, 4);
    let first = loader.last().expect("first clip");

    // 1s left of a 2s fade: next drawn at half opacity.
    first.state_mut().position = 0.9;
    assert_eq!(player.draw(&mut canvas), Transition::FadeStarted);
    let alpha = player.next_alpha().expect("fading");
    assert!((126..=128).contains(&alpha));

    let (a, b) = (color_for(0), color_for(1));
    let px = canvas.get(1, 1);
    let mid = |x: u8, y: u8| ((x as u32 + y as u32) / 2) as i32;
    assert!((px.r as i32 - mid(a.r, b.r)).abs() <= 2);
    assert!((px.b as i32 - mid(a.b, b.b)).abs() <= 2);
}

#[test]
fn advance_seeks_into_fade_window() {
    let (mut player, _loader) = on_demand_player(2, 10.0);
    assert!(player.advance());
    assert!(player.current().time_left() <= settings().fade_time);

    let mut canvas = Canvas::new(40, 10);
    assert_eq!(tick(&mut player, &mut canvas), Transition::FadeStarted);
}

#[test]
fn advance_on_short_clip_clamps_to_start() {
    let (mut player, loader) = on_demand_player(2, 1.5);
    loader.last().expect("clip").state_mut().position = 0.5;
    assert!(player.advance());
    assert_eq!(player.current().clip().position(), 0.0);
}

#[test]
fn advance_while_fading_is_a_no_op() {
    let (mut player, loader) = on_demand_player(2, 10.0);
    let mut canvas = Canvas::new(40, 10);
    let first = loader.last().expect("first clip");
    first.state_mut().position = 0.9;
    assert_eq!(tick(&mut player, &mut canvas), Transition::FadeStarted);

    let before = first.state().position;
    assert!(!player.advance());
    assert_eq!(first.state().position, before);
    assert_eq!(loader.instances().len(), 2, "no extra selection");
}

#[test]
fn pool_never_repeats_current_by_identity() {
    let clips: Vec<FakeClip> = (0..3).map(|i| FakeClip::new(4.5, color_for(i))).collect();
    let mut player = pool_player(&clips, PlayOrder::Random);
    let mut canvas = Canvas::new(40, 10);

    let mut history = vec![player.current().id()];
    for _ in 0..(60 * 60) {
        if tick(&mut player, &mut canvas) == Transition::Swapped {
            history.push(player.current().id());
        }
    }
    assert!(history.len() > 10);
    for pair in history.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    // Pool clips are recycled, never closed.
    assert!(clips.iter().all(|c| !c.state().closed));
}

#[test]
fn released_pool_clip_is_rewound_and_paused() {
    let clips: Vec<FakeClip> = (0..2).map(|i| FakeClip::new(10.0, color_for(i))).collect();
    let mut player = pool_player(&clips, PlayOrder::Sequential);
    let mut canvas = Canvas::new(40, 10);

    clips[0].state_mut().position = 0.9;
    assert_eq!(player.draw(&mut canvas), Transition::FadeStarted);
    clips[0].state_mut().playing = false;
    assert_eq!(player.draw(&mut canvas), Transition::Swapped);

    let old = clips[0].state();
    assert_eq!(old.position, 0.0);
    assert!(old.paused);
    assert_eq!(player.provider().parked(), 1);
}

#[test]
fn one_clip_pool_keeps_the_current_clip_when_nothing_can_follow() {
    let clips = vec![FakeClip::new(10.0, color_for(0))];
    let mut player = pool_player(&clips, PlayOrder::Random);
    let mut canvas = Canvas::new(40, 10);
    let id = player.current().id();

    clips[0].state_mut().position = 0.9;
    for n in 1..=5 {
        assert_eq!(tick(&mut player, &mut canvas), Transition::SelectFailed);
        assert_eq!(player.select_failures(), n);
        assert_eq!(player.current().id(), id);
        assert!(!player.is_fading());
    }

    // Past the end the clip holds its last frame and the deck stays intact.
    clips[0].state_mut().position = 1.0;
    clips[0].state_mut().playing = false;
    assert_eq!(tick(&mut player, &mut canvas), Transition::SelectFailed);
    assert_eq!(player.current().id(), id);
    assert_eq!(canvas.get(0, 0), color_for(0));
}

#[test]
fn broken_alternatives_fail_selection_without_blocking_the_tick() {
    let (source, loader) = FakeLoader::with_files(vec![
        FakeFile::Broken,
        FakeFile::Clip {
            duration: 10.0,
            color: color_for(1),
        },
    ]);
    let provider = OnDemandProvider::new(source, loader);
    let selector = Selector::new(SelectorSettings {
        order: PlayOrder::Sequential,
        repeat_policy: RepeatPolicy::Content,
        min_duration: 0.0,
        seed: None,
    });
    let mut player = Player::new(provider, selector, settings()).expect("first clip");
    let mut canvas = Canvas::new(40, 10);
    assert_eq!(player.current().source_index(), 1);

    assert!(player.advance());
    for n in 1..=3 {
        assert_eq!(tick(&mut player, &mut canvas), Transition::SelectFailed);
        assert_eq!(player.select_failures(), n);
    }
    assert_eq!(player.current().source_index(), 1);
    assert!(!player.is_fading());
}

#[test]
fn clip_without_known_length_is_handed_over_immediately() {
    let (source, loader) = FakeLoader::with_files(vec![
        FakeFile::Clip {
            duration: f32::NAN,
            color: color_for(0),
        },
        FakeFile::Clip {
            duration: 10.0,
            color: color_for(1),
        },
    ]);
    let provider = OnDemandProvider::new(source, loader);
    let mut player = Player::new(provider, seeded(PlayOrder::Sequential), settings())
        .expect("first clip");
    let mut canvas = Canvas::new(40, 10);
    assert_eq!(player.current().source_index(), 0);

    assert_eq!(player.draw(&mut canvas), Transition::FadeStarted);
    assert_eq!(player.draw(&mut canvas), Transition::Swapped);
    assert_eq!(player.current().source_index(), 1);
    assert!(!player.is_fading());
}

#[test]
fn status_line_shows_timing_and_fade_target() {
    let mut status = PlayerStatus {
        time_left: 1.5,
        position: 0.5,
        duration: 10.0,
        stuck_progress: None,
        fading: false,
        current_index: 3,
        next_index: None,
    };
    assert_eq!(
        status.to_string(),
        "clip #3 left   1.50s pos 0.500 dur  10.00s stuck -"
    );

    status.stuck_progress = Some(0.5);
    status.fading = true;
    status.next_index = Some(4);
    assert_eq!(
        status.to_string(),
        "clip #3 left   1.50s pos 0.500 dur  10.00s stuck 0.5000 fading -> #4"
    );
}

#[test]
fn player_status_tracks_the_deck() {
    let (mut player, loader) = on_demand_player(2, 10.0);
    let mut canvas = Canvas::new(40, 10);
    loader.last().expect("clip").state_mut().position = 0.9;
    assert_eq!(player.draw(&mut canvas), Transition::FadeStarted);

    let status = player.status();
    assert!(status.fading);
    assert_eq!(status.current_index, 0);
    assert_eq!(status.next_index, Some(1));
    assert!(status.to_string().ends_with("fading -> #1"));
}
