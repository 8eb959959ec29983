//! File transport behaviour when driven by the full service

use faultline_logging::rotated_path;
use integration_tests::common::*;
use integration_tests::*;

#[tokio::test]
async fn test_service_writes_json_log_file() {
    let dir = temp_dir();
    let config = file_logging_config(dir.path(), 1024 * 1024, 3);
    let log_path = config.logging.file_path.clone().unwrap();
    let (service, _memory) = create_test_service(config).await;

    service
        .handle_error(ErrorBuilder::validation("email", "missing @").build())
        .await;
    service
        .handle_error(ErrorBuilder::authorization("/admin").build())
        .await;
    service.close().await;

    let lines = read_log_lines(&log_path, 3);
    let handler_lines: Vec<_> = lines
        .iter()
        .filter(|line| line["component"] == "error-handler")
        .collect();
    assert_eq!(handler_lines.len(), 2);
    assert_eq!(handler_lines[0]["level"], "info");
    assert_eq!(handler_lines[1]["level"], "error");
    assert_eq!(handler_lines[1]["data"]["code"], "ACCESS_DENIED");
    assert_eq!(handler_lines[1]["logger"], "faultline");
    assert!(!rotated_path(&log_path, 1).exists());
}

#[tokio::test]
async fn test_rotation_keeps_bounded_file_set() {
    let dir = temp_dir();
    let config = file_logging_config(dir.path(), 512, 2);
    let log_path = config.logging.file_path.clone().unwrap();
    let (service, _memory) = create_test_service(config).await;

    for i in 0..20 {
        service
            .handle_error(ErrorBuilder::validation(format!("field{i}"), "bad").build())
            .await;
    }
    service.close().await;

    assert!(log_path.exists());
    assert!(rotated_path(&log_path, 1).exists());
    assert!(rotated_path(&log_path, 2).exists());
    assert!(!rotated_path(&log_path, 3).exists());

    // The newest record always lands in the active file
    let active = std::fs::read_to_string(&log_path).unwrap();
    assert!(active.contains("field19"));

    for line in read_log_lines(&log_path, 2) {
        assert!(line["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_oversized_file_from_previous_run_is_rotated() {
    let dir = temp_dir();
    let config = file_logging_config(dir.path(), 256, 2);
    let log_path = config.logging.file_path.clone().unwrap();
    std::fs::create_dir_all(log_path.parent().unwrap()).unwrap();
    std::fs::write(&log_path, "x".repeat(300)).unwrap();

    let (service, _memory) = create_test_service(config).await;
    service.logger().info("fresh start");
    service.close().await;

    let rotated = std::fs::read_to_string(rotated_path(&log_path, 1)).unwrap();
    assert_eq!(rotated.len(), 300);
    let active = std::fs::read_to_string(&log_path).unwrap();
    assert!(active.contains("fresh start"));
}
