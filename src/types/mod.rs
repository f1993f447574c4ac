mod credentials;
mod ddl_delta;
mod diff_row;
mod endpoint;
mod progress;
mod result_set;
mod script;
mod session_token;

pub use credentials::Credentials;
pub use ddl_delta::{DdlDelta, DeltaRequest};
pub use diff_row::{DiffRow, DiffStatus, ObjectType, ResultRow, RowId};
pub use endpoint::{Endpoint, EndpointSpec, Side};
pub use progress::{CompareState, Progress, SessionProgress};
pub use result_set::{ResultSet, StatusCounts, TypeGroup};
pub use script::{ScriptDraft, ScriptFragment};
pub use session_token::SessionToken;
