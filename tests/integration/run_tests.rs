use nwbuilder::{RunOutcome, RunPipeline, RunRequest};

use super::common::*;

fn run_request(env: &TestEnv) -> RunRequest {
    RunRequest {
        args: vec![env.app_dir().to_string_lossy().into_owned()],
        ..RunRequest::default()
    }
}

#[cfg(unix)]
#[tokio::test]
async fn attached_run_returns_the_exit_code() {
    let env = TestEnv::new();
    let provider = env.provider().exiting_with(7);
    let config = env.config();

    let outcome = RunPipeline::new(&provider, &provider, &provider, &config)
        .with_target(linux64())
        .run(&run_request(&env))
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Exited(7));
    assert_eq!(provider.fetches(), vec![linux64()]);
}

#[cfg(unix)]
#[tokio::test]
async fn detached_run_keeps_its_working_copy() {
    let env = TestEnv::new();
    let provider = env.provider();
    let config = nwbuilder::BuilderConfig {
        detach_settle_ms: 50,
        ..env.config()
    };
    let request = RunRequest {
        detached: true,
        ..run_request(&env)
    };

    let outcome = RunPipeline::new(&provider, &provider, &provider, &config)
        .with_target(linux64())
        .run(&request)
        .await
        .unwrap();

    let RunOutcome::Detached { working_dir, .. } = outcome else {
        panic!("expected a detached run, got {outcome:?}");
    };
    assert!(working_dir.join("nw").is_file());
    std::fs::remove_dir_all(working_dir).unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn run_mode_injects_the_codec_into_its_copy() {
    let env = TestEnv::new();
    let provider = env.provider();
    let config = nwbuilder::BuilderConfig {
        detach_settle_ms: 0,
        ..env.config()
    };
    let request = RunRequest {
        detached: true,
        with_codec: true,
        ..run_request(&env)
    };

    let outcome = RunPipeline::new(&provider, &provider, &provider, &config)
        .with_target(linux64())
        .run(&request)
        .await
        .unwrap();

    let RunOutcome::Detached { working_dir, .. } = outcome else {
        panic!("expected a detached run, got {outcome:?}");
    };
    assert_eq!(
        std::fs::read(working_dir.join("lib/libffmpeg.so")).unwrap(),
        FULL_CODEC
    );
    // The cached runtime is left alone
    let cached = env.runtime_root().join("nwjs-v0.14.7-linux-x64/lib/libffmpeg.so");
    assert_eq!(std::fs::read(cached).unwrap(), STOCK_CODEC);
    std::fs::remove_dir_all(working_dir).unwrap();
}

#[tokio::test]
async fn missing_executable_is_not_found() {
    let env = TestEnv::new();
    let provider = env.provider();
    let config = env.config();

    // Pre-seeded runtime without the `nw` binary
    let runtime = env.runtime_root().join("nwjs-v0.14.7-linux-x64");
    write(&runtime.join("README"), b"not a runtime");

    let err = RunPipeline::new(&provider, &provider, &provider, &config)
        .with_target(linux64())
        .run(&run_request(&env))
        .await
        .unwrap_err();
    assert!(is_not_found(&err));
}
