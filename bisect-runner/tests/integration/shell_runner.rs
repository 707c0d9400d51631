// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::ids;
use bisect_runner::{
    coordinator::{BisectCoordinator, BisectOutcome},
    errors::{BisectError, ProbeRunnerError},
    minimize::MinimizeStatus,
    reporter::{CancelReason, ProgressSink},
    runner::{PassIds, ProbeRunner, ShellRunner},
    signal::SignalHandlerKind,
};
use camino::Utf8PathBuf;
use camino_tempfile::Utf8TempDir;
use indoc::{formatdoc, indoc};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::sync::Mutex;

/// Held by tests that install the standard signal handler, since signals are delivered to the
/// whole test process.
static SIGNAL_LOCK: Mutex<()> = Mutex::const_new(());

/// A suite of four examples: `c` always fails, and `b` fails whenever `a` runs.
const SUITE_SCRIPT: &str = indoc! {r#"
    [ "$BISECT" = 1 ] || exit 3
    if [ -n "$BISECT_EXAMPLE_IDS_FILE" ]; then
        set -- $(cat "$BISECT_EXAMPLE_IDS_FILE")
    fi
    if [ $# -eq 0 ]; then
        set -- a b c d
    fi

    has_a=0
    for id in "$@"; do
        if [ "$id" = a ]; then has_a=1; fi
    done

    all=""
    failed=""
    for id in "$@"; do
        all="$all\"$id\","
        case "$id" in
            b) if [ "$has_a" = 1 ]; then failed="$failed\"$id\","; fi ;;
            c) failed="$failed\"$id\"," ;;
        esac
    done

    printf '{"all-example-ids":[%s],"failed-example-ids":[%s]}' "${all%,}" "${failed%,}" \
        > "$BISECT_RESULTS_FILE"
    exit 1
"#};

fn write_script(contents: &str) -> (Utf8TempDir, Utf8PathBuf) {
    let dir = camino_tempfile::tempdir().expect("temp dir created");
    let path = dir.path().join("suite.sh");
    std::fs::write(&path, contents).expect("script written");
    (dir, path)
}

async fn bisect_with(pass_ids: PassIds) {
    let (_dir, script) = write_script(SUITE_SCRIPT);
    let mut runner = ShellRunner::new(["sh", script.as_str()]).expect("command is non-empty");
    runner.set_pass_ids(pass_ids);

    let coordinator = BisectCoordinator::new("", SignalHandlerKind::Noop);
    let mut sink = ProgressSink::new();
    let outcome = coordinator
        .bisect(runner, &mut sink)
        .await
        .expect("bisection succeeds");

    assert_eq!(outcome.target_ids, ids(["b", "c"]));
    assert_eq!(outcome.minimal_ids, Ok(ids(["a", "b", "c"])));
    assert_eq!(outcome.probe_count, 3);
}

#[tokio::test]
async fn bisect_passing_ids_as_args() {
    bisect_with(PassIds::Args).await;
}

#[tokio::test]
async fn bisect_passing_ids_in_file() {
    bisect_with(PassIds::File).await;
}

#[tokio::test]
async fn results_missing() {
    let (_dir, script) = write_script("exit 0\n");
    let mut runner = ShellRunner::new(["sh", script.as_str()]).expect("command is non-empty");

    let error = runner
        .run_full_suite()
        .await
        .expect_err("no results were written");
    match error {
        ProbeRunnerError::ResultsMissing { exit_code, .. } => assert_eq!(exit_code, Some(0)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn results_malformed() {
    let (_dir, script) = write_script("printf 'not json' > \"$BISECT_RESULTS_FILE\"\n");
    let mut runner = ShellRunner::new(["sh", script.as_str()]).expect("command is non-empty");

    let error = runner
        .run(&ids(["a"]))
        .await
        .expect_err("results are malformed");
    assert!(
        matches!(error, ProbeRunnerError::ResultsParse { .. }),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn probe_timeout() {
    let (_dir, script) = write_script("sleep 30\n");
    let mut runner = ShellRunner::new(["sh", script.as_str()]).expect("command is non-empty");
    runner.set_timeout(Duration::from_millis(200));

    let error = runner
        .run_full_suite()
        .await
        .expect_err("probe times out");
    assert!(
        matches!(error, ProbeRunnerError::Timeout { .. }),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn spawn_failure_fails_bisection() {
    let runner = ShellRunner::new(["/nonexistent/test-bisect-suite"]).expect("command is non-empty");

    let coordinator = BisectCoordinator::new("", SignalHandlerKind::Noop);
    let mut sink = ProgressSink::new();
    let error = coordinator
        .bisect(runner, &mut sink)
        .await
        .expect_err("the suite can't be spawned");
    assert!(
        matches!(
            error,
            BisectError::ProbeRunner(ProbeRunnerError::Spawn { .. })
        ),
        "unexpected error: {error:?}"
    );
}

/// A suite of three examples where `3` fails only when the whole suite runs. When `3` is run on
/// its own, the suite interrupts test-bisect, then runs `on_interrupt`.
fn interrupting_suite(on_interrupt: &str) -> String {
    formatdoc! {
        r#"
            if [ $# -eq 0 ]; then
                set -- 1 2 3
            fi
            if [ $# -eq 1 ]; then
                kill -INT $PPID
                # Leave time for the interrupt to be handled while the suite is still running.
                sleep 1
                {on_interrupt}
            fi

            all=""
            failed=""
            for id in "$@"; do
                all="$all\"$id\","
                if [ "$id" = 3 ] && [ $# -eq 3 ]; then failed="$failed\"$id\","; fi
            done

            printf '{{"all-example-ids":[%s],"failed-example-ids":[%s]}}' "${{all%,}}" "${{failed%,}}" \
                > "$BISECT_RESULTS_FILE"
        "#
    }
}

async fn bisect_with_signals(script: &Utf8PathBuf) -> Result<BisectOutcome, BisectError> {
    let runner = ShellRunner::new(["sh", script.as_str()]).expect("command is non-empty");
    let coordinator = BisectCoordinator::new("", SignalHandlerKind::Standard);
    let mut sink = ProgressSink::new();
    coordinator.bisect(runner, &mut sink).await
}

#[tokio::test]
async fn interrupt_lets_running_suite_finish() {
    let _guard = SIGNAL_LOCK.lock().await;
    let (dir, script) = write_script(&interrupting_suite(r#"touch "$(dirname "$0")/finished""#));

    let outcome = bisect_with_signals(&script)
        .await
        .expect("interrupted bisection is not an error");

    assert_eq!(outcome.status, MinimizeStatus::Aborted(CancelReason::Interrupt));
    assert_eq!(outcome.target_ids, ids(["3"]));
    assert_eq!(outcome.minimal_ids, Ok(ids(["1", "2", "3"])));
    assert_eq!(outcome.order_dependent, None);
    assert!(
        dir.path().join("finished").exists(),
        "the suite ran to completion after the interrupt"
    );
}

#[tokio::test]
async fn interrupt_discards_incomplete_results() {
    let _guard = SIGNAL_LOCK.lock().await;
    let (_dir, script) = write_script(&interrupting_suite("exit 130"));

    let outcome = bisect_with_signals(&script)
        .await
        .expect("missing results after an interrupt are not an error");

    assert_eq!(outcome.status, MinimizeStatus::Aborted(CancelReason::Interrupt));
    assert_eq!(outcome.minimal_ids, Ok(ids(["1", "2", "3"])));
}

#[tokio::test]
async fn suite_interrupts_stay_in_its_process_group() {
    let _guard = SIGNAL_LOCK.lock().await;
    let script_contents = format!("trap '' INT\nkill -INT 0\n{SUITE_SCRIPT}");
    let (_dir, script) = write_script(&script_contents);

    let outcome = bisect_with_signals(&script)
        .await
        .expect("bisection succeeds");

    assert_eq!(outcome.status, MinimizeStatus::Complete);
    assert_eq!(outcome.minimal_ids, Ok(ids(["a", "b", "c"])));
}
