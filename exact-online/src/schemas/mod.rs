//! Built-in entity descriptors for commonly used endpoints
//!
//! Applications register further descriptors on their own
//! [`MetadataRegistry`](crate::api::MetadataRegistry).

mod crm;
mod financial;
mod sales;
mod system;

pub use crm::account;
pub use financial::gl_account;
pub use sales::{sales_invoice, sales_invoice_line};
pub use system::{division, me};

use crate::api::EntityDescriptor;

/// Every built-in descriptor
pub fn all() -> Vec<EntityDescriptor> {
    vec![
        me(),
        division(),
        account(),
        gl_account(),
        sales_invoice(),
        sales_invoice_line(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EntityMetadata, Operation};

    #[test]
    fn test_all_builtin_schemas_compile() {
        for descriptor in all() {
            let metadata = EntityMetadata::compile(&descriptor)
                .unwrap_or_else(|e| panic!("{} failed to compile: {}", descriptor.tag, e));
            assert_eq!(metadata.keys().len(), 1, "{} should have one key", descriptor.tag);
        }
    }

    #[test]
    fn test_me_is_read_only_and_division_free() {
        let me = EntityMetadata::compile(&me()).unwrap();
        assert!(me.supports(Operation::Read));
        assert!(!me.supports(Operation::Create));
        assert!(!me.requires_division());
        assert!(me.field("CurrentDivision").is_some());
    }
}
