//! The boundary between the answer model and a document-generation service.
//!
//! Implementations wrap a concrete transport (REST or SOAP, on-premise or
//! cloud). The trait is annotated for `mockall` so hosts can test their
//! assembly flows without a server.

use async_trait::async_trait;
use docforge_answers::ValueKind;
use mockall::automock;

use crate::ServiceError;

/// Where a template lives on the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLocator {
    /// Identifier of the uploaded template package.
    pub package_id: String,

    /// Template within the package; `None` selects the package's main
    /// template.
    pub template_name: Option<String>,
}

impl TemplateLocator {
    /// Locate the main template of a package.
    pub fn main(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            template_name: None,
        }
    }
}

/// Document format produced by an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The template's native word-processor format.
    Native,
    Pdf,
    Html,
    PlainText,
}

/// Interview runtime requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewFormat {
    JavaScript,
    Silverlight,
}

/// A request to assemble a document.
#[derive(Debug, Clone)]
pub struct AssembleRequest {
    pub template: TemplateLocator,

    /// Serialized answer-set XML, as produced by
    /// `docforge_answers::AnswerCollection::xml_answers`.
    pub answer_xml: String,

    pub format: OutputFormat,

    /// Service-defined settings, passed through as key/value pairs.
    pub settings: Vec<(String, String)>,
}

/// One named binary part of a service result (the document itself, images
/// it references, interview definition files).
#[derive(Debug, Clone)]
pub struct BinaryPart {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A follow-up assembly queued by the assembled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAssembly {
    pub template_name: String,

    /// Command-line style switches the template attached to the request.
    pub switches: String,
}

/// The outcome of an assembly call.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    pub parts: Vec<BinaryPart>,

    /// Names of variables the interview left unanswered.
    pub unanswered_variables: Vec<String>,

    /// Assemblies the service expects the caller to run next.
    pub pending_assemblies: Vec<PendingAssembly>,
}

/// A request for a template's interview.
#[derive(Debug, Clone)]
pub struct InterviewRequest {
    pub template: TemplateLocator,
    pub answer_xml: String,
    pub format: InterviewFormat,
    pub settings: Vec<(String, String)>,
}

/// Interview markup plus its supporting files.
#[derive(Debug, Clone)]
pub struct InterviewResult {
    /// HTML fragment the host page embeds.
    pub html_fragment: String,
    pub parts: Vec<BinaryPart>,
}

/// A variable defined by a template's component file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub kind: ValueKind,
}

/// A dialog defined by a template's component file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogInfo {
    pub name: String,

    /// Names of the variables shown on the dialog, in order.
    pub items: Vec<String>,

    pub repeated: bool,
}

/// Variable and dialog metadata for a template.
#[derive(Debug, Clone, Default)]
pub struct ComponentInfo {
    pub variables: Vec<VariableInfo>,
    pub dialogs: Vec<DialogInfo>,
}

/// A document-generation service.
///
/// Implementations must release their transport resources on every exit
/// path; a failure while releasing must not mask the operation's result.
/// Calls on one instance are not overlapped.
#[automock]
#[async_trait]
pub trait AssemblyService {
    /// Assemble a document from a template and serialized answers.
    async fn assemble(&self, request: AssembleRequest) -> Result<AssembleResult, ServiceError>;

    /// Retrieve the interview for a template, primed with the given
    /// answers.
    async fn get_interview(
        &self,
        request: InterviewRequest,
    ) -> Result<InterviewResult, ServiceError>;

    /// Retrieve variable and dialog metadata for a template.
    async fn get_component_info(
        &self,
        template: TemplateLocator,
    ) -> Result<ComponentInfo, ServiceError>;

    /// Overlay several serialized answer sets into one, later sets taking
    /// precedence for answered values.
    async fn combine_answers(&self, answer_xmls: Vec<String>) -> Result<String, ServiceError>;
}
