//! Client-side contract for a remote document-generation service.
//!
//! The answer model lives in `docforge-answers`; this crate defines the
//! operations a host application requests from the service - document
//! assembly, interview retrieval, component metadata, answer combining -
//! and the plain data types those operations exchange. Concrete transports
//! implement [`AssemblyService`]; tests mock it.

mod contract;
pub use contract::{
    AssembleRequest, AssembleResult, AssemblyService, BinaryPart, ComponentInfo, DialogInfo,
    InterviewFormat, InterviewRequest, InterviewResult, MockAssemblyService, OutputFormat,
    PendingAssembly, TemplateLocator, VariableInfo,
};

mod combine;
pub use combine::combine_answer_xml;

mod error;
pub use error::ServiceError;
