//! 业务服务层：中介管线与家长审批门

pub mod approval_gate;
pub mod mediation;

pub use approval_gate::{
    ApprovalGate, ApprovalRequest, GateState, HttpPinVerifier, PinVerifier, PipelineSubmitter,
    SubmitOutcome, TurnSubmitter,
};
pub use mediation::{MediationReply, MediationRequest, MediationService};
