// Herald - Declarative mailers for Rust
//
// Mailers declare their headers once; bodies come from templates found by
// naming convention and are assembled into multipart messages per delivery.

// Re-export core functionality
pub use herald_mail::*;

// Re-export the mail crate itself
pub use herald_mail;

// Prelude for common imports
pub mod prelude {
    pub use herald_mail::prelude::*;
}
