//! User-facing status strings.
//!
//! Every failure in the client resolves to one of these flat messages; no
//! structured error code reaches the user.

/// Shown while the scanner is waiting for a code.
pub const SCANNING: &str = "Scanning QR Code...";

/// The camera collaborator could not decode a frame.
pub const SCAN_ERROR: &str = "Error scanning QR Code";

/// Fallback acknowledgment when the backend omits its `message`.
pub const VISIT_RECORDED: &str = "Time in done!";

/// Any failure while reporting a visit.
pub const SUBMISSION_FAILED: &str = "Error submitting timesheet";

pub const TOKEN_GENERATED: &str = "QR Code generated. You can now add the company.";

/// Organization creation attempted without a generated token.
pub const TOKEN_REQUIRED: &str = "Please generate a QR code first.";

pub const COMPANY_ADDED: &str = "Company added successfully";
pub const COMPANY_ADD_FAILED: &str = "Error adding company";
pub const COMPANIES_FETCH_FAILED: &str = "Error fetching companies";

pub const STUDENT_ADDED: &str = "Student added successfully";
pub const STUDENT_ADD_FAILED: &str = "Error adding student";
