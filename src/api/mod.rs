//! Boundary for an HTTP front end: JSON in, status + JSON out.
//!
//! The front end owns routing and transport. [`DeleteService::handle_delete`]
//! runs one deletion request through authorization and execution and returns
//! the status code and body to send back.

pub mod wire;

use serde::Serialize;
use serde_json::Value;

use crate::core::errors::CullError;
use crate::curation::authorization::DeletionAuthorizer;
use crate::curation::deletion::{DeleteCollaborator, DeletionExecutor};
use crate::curation::protection::ProtectionRegistry;

use self::wire::{DeleteRequestBody, DeleteResponseBody, ErrorBody};

/// Status code and JSON body for the front end to send.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl WireResponse {
    fn json(status: u16, body: &impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(err) => Self::error(&CullError::from(err)),
        }
    }

    fn error(err: &CullError) -> Self {
        let body = ErrorBody::from_error(err);
        Self {
            status: body.status,
            body: serde_json::to_value(&body).unwrap_or(Value::Null),
        }
    }
}

/// Deletion endpoint logic over the authoritative registry.
pub struct DeleteService<'a> {
    authorizer: &'a DeletionAuthorizer,
    registry: &'a ProtectionRegistry,
    executor: &'a DeletionExecutor,
}

impl<'a> DeleteService<'a> {
    #[must_use]
    pub const fn new(
        authorizer: &'a DeletionAuthorizer,
        registry: &'a ProtectionRegistry,
        executor: &'a DeletionExecutor,
    ) -> Self {
        Self {
            authorizer,
            registry,
            executor,
        }
    }

    /// Parse, authorize and execute one `DeleteRequestBody`.
    pub fn handle_delete(&self, raw: &str, collaborator: &dyn DeleteCollaborator) -> WireResponse {
        let body: DeleteRequestBody = match serde_json::from_str(raw) {
            Ok(body) => body,
            Err(err) => {
                return WireResponse::error(&CullError::validation(
                    "request_body",
                    err.to_string(),
                ));
            }
        };

        let snapshot = body.effective_snapshot(&self.registry.snapshot());
        let batch = match self.authorizer.authorize(&body.to_request(), &snapshot) {
            Ok(batch) => batch,
            Err(reason) => {
                return WireResponse::json(
                    reason.http_status(),
                    &ErrorBody::from_rejection(&reason),
                );
            }
        };

        let result = self
            .executor
            .execute_batch(&batch, body.delete_files, collaborator);
        let files_deleted = batch.also_delete_files() && body.delete_files;
        let response = DeleteResponseBody::from_result(&result, files_deleted);
        WireResponse::json(response.status(), &response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Secret;
    use crate::curation::deletion::{DeletedItem, ExecutionFailure};
    use crate::library::item::ItemId;

    struct AlwaysOk;

    impl DeleteCollaborator for AlwaysOk {
        fn delete(
            &self,
            id: ItemId,
            _also_delete_files: bool,
        ) -> Result<DeletedItem, ExecutionFailure> {
            Ok(DeletedItem {
                id,
                title: format!("#{id}"),
                year: None,
                bytes_freed: 1_073_741_824,
            })
        }
    }

    fn fixture() -> (DeletionAuthorizer, ProtectionRegistry, DeletionExecutor) {
        (
            DeletionAuthorizer::new(&Secret::new("pw")),
            ProtectionRegistry::from_ids([ItemId(9)]),
            DeletionExecutor::new(2),
        )
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        let (authorizer, registry, executor) = fixture();
        let service = DeleteService::new(&authorizer, &registry, &executor);
        let response = service.handle_delete("{not json", &AlwaysOk);
        assert_eq!(response.status, 400);
        assert_eq!(response.body["code"], "MCL-1101");
    }

    #[test]
    fn authorized_request_deletes_and_reports() {
        let (authorizer, registry, executor) = fixture();
        let service = DeleteService::new(&authorizer, &registry, &executor);
        let response = service.handle_delete(
            r#"{"rating_keys": [1, 2], "password": "pw", "delete_files": false,
                "untouchables": [], "confirmations": [true, true, true]}"#,
            &AlwaysOk,
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.body["total"], 2);
        assert_eq!(response.body["space_freed_gb"], 2.0);
    }

    #[test]
    fn protected_items_are_refused_with_their_ids() {
        let (authorizer, registry, executor) = fixture();
        let service = DeleteService::new(&authorizer, &registry, &executor);
        let response = service.handle_delete(
            r#"{"rating_keys": [1, 9, 4], "password": "pw", "delete_files": false,
                "untouchables": [4], "confirmations": [true, true, true]}"#,
            &AlwaysOk,
        );
        assert_eq!(response.status, 403);
        assert_eq!(response.body["protected_ids"], serde_json::json!([9, 4]));
    }

    #[test]
    fn missing_confirmations_fail_closed() {
        let (authorizer, registry, executor) = fixture();
        let service = DeleteService::new(&authorizer, &registry, &executor);
        let response = service.handle_delete(
            r#"{"rating_keys": [1], "password": "pw", "delete_files": false, "untouchables": []}"#,
            &AlwaysOk,
        );
        assert_eq!(response.status, 400);
        assert_eq!(response.body["code"], "incomplete_confirmation");
    }
}
