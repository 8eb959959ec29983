//! Concurrent use of a shared service

use integration_tests::common::*;
use integration_tests::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_errors_are_all_recorded() {
    let dir = temp_dir();
    let config = file_logging_config(dir.path(), 2048, 3);
    let (service, memory) = create_test_service(config).await;
    let service = Arc::new(service);

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                let error = match i % 3 {
                    0 => ErrorBuilder::validation(format!("field{i}"), "bad").build(),
                    1 => ErrorBuilder::authentication("expired").build(),
                    _ => ErrorBuilder::configuration("timeout", "negative")
                        .detail("default_value", json!(10))
                        .build(),
                };
                service.handle_error(error).await
            })
        })
        .collect();

    let mut recovered = 0;
    for task in tasks {
        if task.await.unwrap().recovered() {
            recovered += 1;
        }
    }
    service.close().await;

    let metrics = service.metrics();
    assert_eq!(metrics.total_errors, 100);
    assert_eq!(metrics.errors_by_category[&ErrorCategory::Validation], 34);
    assert_eq!(metrics.errors_by_category[&ErrorCategory::Authentication], 33);
    assert_eq!(metrics.errors_by_category[&ErrorCategory::Configuration], 33);
    assert_eq!(recovered, 33);
    assert!((metrics.recovery_success_rate - 0.33).abs() < 1e-9);

    let handler_entries = memory
        .entries()
        .iter()
        .filter(|e| e.component.as_deref() == Some("error-handler"))
        .count();
    assert_eq!(handler_entries, 100);
}
