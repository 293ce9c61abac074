//! CLI support.
//!
//! The binary's commands map onto gateway requests:
//!
//! | Command | Request |
//! |---------|---------|
//! | `insert --source S --data k=v ...` | INSERT |
//! | `update --key K --source S --data k=v ...` | UPDATE |
//! | `delete --key K --source S` | DELETE |
//! | `search --key K` | SEARCH |
//! | `process` | One JSON request per stdin line |
//! | `status` | Store statistics |
//! | `config --show` | Effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! aadhaar-linkage insert --source Aadhaar \
//!     --data forename=Asha --data dob=1990-01-01 --data aadhaar_number=1234
//!
//! aadhaar-linkage search --key 2f1c6a8e-...
//!
//! aadhaar-linkage --data-dir /tmp/ids --pseudonymizer hmac status
//! ```

mod request;
mod status;

pub use request::{build_request, parse_data};
pub use status::StatusReport;
