// Models module - Normalized record shapes exposed to the presentation layer

pub mod membership;
pub mod row;
pub mod session;
pub mod workshop;

pub use membership::MembershipRecord;
pub use row::RemoteRow;
pub use session::{AuthEvent, Session, SessionState, User};
pub use workshop::WorkshopRecord;
