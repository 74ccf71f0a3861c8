mod cache;
mod selector;

pub use cache::{IdentityMap, IdentityMapCache, IDENTITY_CACHE_CAPACITY};
pub use selector::{EditorSelector, MembershipCache};
