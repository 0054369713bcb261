//! Wire message schemas for the record RPC protocol.
//!
//! The same types are used by the binary transport (named `MsgPack` via
//! `rmp_serde::to_vec_named()`) and by the JSON gateway (`serde_json`), so
//! both protocols share one field naming scheme.

pub mod envelope;
pub mod records;

pub use envelope::{RequestFrame, ResponseFrame, RpcOutcome, RpcRequest, RpcResponse};
pub use records::{
    CreateRecordRequest, CreateRecordResponse, GetRecordRequest, GetRecordResponse,
    ListRecordsRequest, ListRecordsResponse,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{RpcStatus, StatusCode};
    use crate::types::{Record, RecordDraft};

    #[test]
    fn request_json_shape_is_method_tagged() {
        let req = RpcRequest::GetRecord(GetRecordRequest { id: "r-1".into() });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "method": "GetRecord", "id": "r-1" }));
    }

    #[test]
    fn create_without_record_decodes_to_none() {
        let req: RpcRequest = serde_json::from_str(r#"{"method":"CreateRecord"}"#).unwrap();
        assert_eq!(req, RpcRequest::CreateRecord(CreateRecordRequest { record: None }));
    }

    #[test]
    fn list_request_has_no_fields() {
        let req: RpcRequest = serde_json::from_str(r#"{"method":"ListRecords"}"#).unwrap();
        assert_eq!(req.method(), "ListRecords");
    }

    #[test]
    fn unknown_method_is_rejected() {
        let result = serde_json::from_str::<RpcRequest>(r#"{"method":"DeleteRecord"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn request_frame_survives_named_msgpack() {
        let frame = RequestFrame {
            call_id: 7,
            request: RpcRequest::CreateRecord(CreateRecordRequest::new(RecordDraft::new(
                "alice", "admin",
            ))),
        };
        let bytes = rmp_serde::to_vec_named(&frame).expect("serialize");
        let decoded: RequestFrame = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn error_outcome_carries_status() {
        let frame = ResponseFrame::new(3, Err(RpcStatus::not_found("missing")));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["callId"], 3);
        assert_eq!(json["outcome"]["kind"], "error");
        assert_eq!(json["outcome"]["status"]["code"], "NOT_FOUND");

        let bytes = rmp_serde::to_vec_named(&frame).expect("serialize");
        let decoded: ResponseFrame = rmp_serde::from_slice(&bytes).expect("deserialize");
        let err = decoded.outcome.into_result().unwrap_err();
        assert_eq!(err.code, StatusCode::NotFound);
    }

    #[test]
    fn list_response_outcome_round_trips() {
        let records = vec![
            Record::from_draft("a", RecordDraft::new("alice", "admin")),
            Record::from_draft("b", RecordDraft::new("bob", "guest")),
        ];
        let frame = ResponseFrame::new(
            11,
            Ok(RpcResponse::ListRecords(ListRecordsResponse { records })),
        );
        let bytes = rmp_serde::to_vec_named(&frame).expect("serialize");
        let decoded: ResponseFrame = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(decoded, frame);
    }
}
