//! Tests for db::repository::error module.

use tour_booking::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use tour_booking::services::ServiceError;

#[test]
fn test_error_context_chaining() {
    let ctx = ErrorContext::new("reserve_seats")
        .with_entity("availability_slot")
        .with_entity_id(42)
        .with_details("booked 10 of 10")
        .retryable();

    assert_eq!(ctx.operation, Some("reserve_seats".to_string()));
    assert_eq!(ctx.entity, Some("availability_slot".to_string()));
    assert_eq!(ctx.entity_id, Some("42".to_string()));
    assert_eq!(ctx.details, Some("booked 10 of 10".to_string()));
    assert!(ctx.retryable);
}

#[test]
fn test_error_context_default_is_empty() {
    let ctx = ErrorContext::default();
    assert!(ctx.operation.is_none());
    assert!(ctx.entity.is_none());
    assert!(!ctx.retryable);
    assert_eq!(ctx.to_string(), "[]");
}

#[test]
fn test_error_context_display() {
    let ctx = ErrorContext::new("get_tour")
        .with_entity("tour")
        .with_entity_id("7")
        .with_details("slug lookup");

    let display = ctx.to_string();
    assert!(display.contains("operation=get_tour"));
    assert!(display.contains("entity=tour"));
    assert!(display.contains("id=7"));
    assert!(display.contains("details=slug lookup"));
    assert!(!display.contains("retryable"));
}

#[test]
fn test_repository_error_messages() {
    let cases = [
        (RepositoryError::connection("pool exhausted"), "Connection error"),
        (RepositoryError::query("bad column"), "Query error"),
        (RepositoryError::not_found("tour 3"), "Not found"),
        (RepositoryError::validation("empty slug"), "validation error"),
        (RepositoryError::conflict("slug taken"), "Conflict"),
        (RepositoryError::configuration("no url"), "Configuration error"),
        (RepositoryError::internal("lock"), "Internal error"),
        (RepositoryError::transaction("rollback"), "Transaction error"),
        (RepositoryError::timeout("slow"), "Timeout error"),
    ];
    for (err, prefix) in cases {
        assert!(
            err.to_string().contains(prefix),
            "{} should contain {}",
            err,
            prefix
        );
    }
}

#[test]
fn test_message_omits_context() {
    let ctx = ErrorContext::new("create_booking").with_entity("booking");
    let err = RepositoryError::internal_with_context("pool closed", ctx);
    assert_eq!(err.message(), "pool closed");
    assert!(err.to_string().contains("operation=create_booking"));
}

#[test]
fn test_retryable_classification() {
    assert!(RepositoryError::connection("temp failure").is_retryable());
    assert!(RepositoryError::timeout("timeout").is_retryable());
    assert!(!RepositoryError::not_found("missing").is_retryable());
    assert!(!RepositoryError::conflict("full").is_retryable());
    assert!(!RepositoryError::validation("invalid").is_retryable());
}

#[test]
fn test_kind_predicates() {
    assert!(RepositoryError::not_found("x").is_not_found());
    assert!(RepositoryError::conflict("x").is_conflict());
    assert!(!RepositoryError::query("x").is_conflict());
}

#[test]
fn test_with_operation_sets_context() {
    let err = RepositoryError::query("error").with_operation("list_bookings");
    assert_eq!(err.context().operation.as_deref(), Some("list_bookings"));
}

#[test]
fn test_service_error_mapping() {
    let not_found: ServiceError = RepositoryError::not_found("booking 9").into();
    assert!(matches!(not_found, ServiceError::NotFound(_)));

    let conflict: ServiceError = RepositoryError::conflict("Slot is full").into();
    assert!(matches!(conflict, ServiceError::Conflict(_)));

    let validation: ServiceError = RepositoryError::validation("bad").into();
    assert!(matches!(validation, ServiceError::Validation(_)));

    let other: ServiceError = RepositoryError::connection("down").into();
    assert!(matches!(other, ServiceError::Repository(_)));
}

#[test]
fn test_repository_result_err() {
    let result: RepositoryResult<i32> = Err(RepositoryError::not_found("test"));
    assert!(result.is_err());
}
