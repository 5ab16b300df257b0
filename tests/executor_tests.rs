use std::path::PathBuf;

use grid_bridge::cmd::{tokenize, CommandExecutor, Execute};
use grid_bridge::config::ExecutorConfig;
use grid_bridge::error::GridError;

/// Create a test executor with default config
fn test_executor() -> CommandExecutor {
    CommandExecutor::new(ExecutorConfig::default())
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

#[tokio::test]
async fn test_execute_simple_command() {
    let result = test_executor().execute(&argv(&["echo", "hello"])).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.std_out, vec!["hello"]);
    assert!(result.std_err.is_empty());
}

#[tokio::test]
async fn test_execute_empty_output() {
    let result = test_executor().execute(&argv(&["true"])).await.unwrap();

    assert!(result.success());
    assert!(result.std_out.is_empty());
}

#[tokio::test]
async fn test_execute_large_output() {
    let result = test_executor().execute(&argv(&["seq", "1", "1000"])).await.unwrap();

    assert_eq!(result.std_out.len(), 1000);
    assert_eq!(result.std_out[999], "1000");
}

#[tokio::test]
async fn test_nonzero_exit_is_a_result_not_an_error() {
    let result = test_executor()
        .execute(&argv(&["sh", "-c", "echo 'error message' >&2; exit 3"]))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert_eq!(result.std_err, vec!["error message"]);
    assert!(matches!(
        result.ensure_success("sh"),
        Err(GridError::NonZeroExit { code: 3, .. })
    ));
}

#[tokio::test]
async fn test_missing_binary_fails_to_start() {
    let err = test_executor()
        .execute(&argv(&["nonexistent_command_12345"]))
        .await
        .unwrap_err();

    assert!(matches!(err, GridError::ProcessStart { ref program, .. } if program == "nonexistent_command_12345"));
}

#[tokio::test]
async fn test_empty_argv_fails_to_start() {
    let err = test_executor().execute(&[]).await.unwrap_err();
    assert!(matches!(err, GridError::ProcessStart { .. }));
}

#[tokio::test]
async fn test_arguments_are_not_shell_expanded() {
    let result = test_executor()
        .execute(&argv(&["echo", "hello $USER", "*"]))
        .await
        .unwrap();

    assert_eq!(result.std_out, vec!["hello $USER *"]);
}

#[tokio::test]
async fn test_quotes_from_tokenizer_reach_program_verbatim() {
    let command = tokenize("printf %s \"a b\"");
    assert_eq!(command, vec!["printf", "%s", "\"a b\""]);

    let result = test_executor().execute(&command).await.unwrap();
    assert_eq!(result.std_out, vec!["\"a b\""]);
}

#[tokio::test]
async fn test_program_dir_prefixes_bare_names() {
    let config = ExecutorConfig {
        program_dir: Some(PathBuf::from("/bin")),
        ..Default::default()
    };
    let result = CommandExecutor::new(config)
        .execute(&argv(&["echo", "prefixed"]))
        .await
        .unwrap();

    assert_eq!(result.std_out, vec!["prefixed"]);
}

#[tokio::test]
async fn test_configured_environment_is_passed() {
    let mut config = ExecutorConfig::default();
    config.env.insert("GRID_BRIDGE_TEST".to_string(), "42".to_string());
    let result = CommandExecutor::new(config)
        .execute(&argv(&["sh", "-c", "echo $GRID_BRIDGE_TEST"]))
        .await
        .unwrap();

    assert_eq!(result.std_out, vec!["42"]);
}

#[tokio::test]
async fn test_multiline_output_keeps_order() {
    let result = test_executor()
        .execute(&argv(&["printf", "line1\\nline2\\nline3\\n"]))
        .await
        .unwrap();

    assert_eq!(result.std_out, vec!["line1", "line2", "line3"]);
}
