use roll_ngin::{
    config::{RenderConfig, Settings},
    pipelines::postprocessing::Task,
    render::{PostPass, Source, Target, post_passes},
};

#[test]
fn direct_copy_reads_main_only() {
    assert_eq!(
        post_passes(false, 6),
        vec![PostPass {
            task: Task::Copy,
            image: Source::Main,
            target: Target::Output,
        }]
    );
}

#[test]
fn bloom_alternates_ping_pong_buffers() {
    let passes = post_passes(true, 6);
    assert_eq!(passes.len(), 7);

    let blur = &passes[..6];
    assert_eq!(blur[0].image, Source::Bright);
    for (i, pass) in blur.iter().enumerate() {
        let horizontal = i % 2 == 0;
        assert_eq!(pass.task, Task::blur(horizontal), "pass {}", i);
        assert_eq!(pass.target, Target::PingPong(horizontal as usize), "pass {}", i);
        if i > 0 {
            // each pass reads what the previous one wrote
            let Source::PingPong(read) = pass.image else {
                panic!("pass {} reads {:?}", i, pass.image);
            };
            assert_eq!(Target::PingPong(read), blur[i - 1].target);
            assert_ne!(Target::PingPong(read), pass.target);
        }
    }

    let combine = passes[6];
    assert_eq!(combine.task, Task::Combine);
    assert_eq!(combine.target, Target::Output);
    assert_eq!(combine.image, Source::PingPong(0));
}

#[test]
fn odd_blur_counts_combine_the_last_written_buffer() {
    let passes = post_passes(true, 3);
    assert_eq!(passes.len(), 4);
    assert_eq!(passes[2].target, Target::PingPong(1));
    assert_eq!(passes[3].image, Source::PingPong(1));
}

#[test]
fn zero_blur_passes_combine_the_bright_target() {
    assert_eq!(
        post_passes(true, 0),
        vec![PostPass {
            task: Task::Combine,
            image: Source::Bright,
            target: Target::Output,
        }]
    );
}

#[test]
fn first_pass_runs_at_a_quarter_of_the_output() {
    let config = RenderConfig::default();
    assert_eq!(config.first_pass_size([800, 600]), [200, 150]);
    assert_eq!(config.first_pass_size([1921, 1079]), [480, 269]);
    // never collapses to an empty target
    assert_eq!(config.first_pass_size([2, 3]), [1, 1]);

    let full = RenderConfig {
        first_pass_divisor: 0,
        ..RenderConfig::default()
    };
    assert_eq!(full.first_pass_size([64, 48]), [64, 48]);
}

#[test]
fn defaults_match_the_reference_tuning() {
    let settings = Settings::default();
    assert!(settings.render.use_postprocessing);
    assert_eq!(settings.render.blur_passes, 6);
    assert_eq!(settings.physics.max_iterations, 10);
    assert_eq!(settings.physics.player_radius, 1.0);
    assert_eq!(settings.physics.camera_radius, 3.0);
    assert!(settings.physics.player_response > 1.0);
    assert!(settings.physics.camera_response > 1.0);
    assert!(settings.level.is_collidable("soil"));
    assert!(!settings.level.is_collidable("player"));
    assert!(settings.level.is_goal("goal"));
    assert!(settings.level.is_destination("destination"));
}
