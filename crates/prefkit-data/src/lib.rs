//! Prefkit Data
//!
//! Deterministic formatting of raw conversation records into the flat text
//! fields consumed by training:
//! - Modelling dialogues as role-tagged turns (`Turn`, `RawRecord`)
//! - Rendering turns through a chat template (`render`, `TemplateSpec`)
//! - Normalizing the leading system message (`ensure_system`)
//! - Validating record shape per task (`validate`)
//! - Extracting preference pairs (`extract_preference_pair`)
//! - Dispatching one record to its task formatter (`format_example`)
//!
//! Everything here is pure and synchronous; records are transformed
//! independently, so callers may fan the work out across threads.

pub mod dialogue;
pub mod error;
pub mod extract;
pub mod format;
pub mod normalize;
pub mod template;
pub mod validate;

pub use dialogue::{is_open_format, is_well_formed, FormattedExample, RawRecord, Role, Turn};
pub use error::{FormatError, FormatResult};
pub use extract::{extract_preference_pair, PreferencePair};
pub use format::{format_example, Task};
pub use normalize::ensure_system;
pub use template::{render, ChatMlTokenizer, ChatTokenizer, RenderMode, TemplateSpec};
pub use validate::validate;
