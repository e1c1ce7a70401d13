// Security module for path validation and access control
//
// Deployments run the deploy CLI inside a caller-supplied working
// directory. This module ensures that directory stays inside the
// configured root, preventing path traversal out of the allowed tree.

pub mod path_validator;

pub use path_validator::{PathSecurityError, validate_path};
