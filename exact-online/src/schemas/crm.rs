//! CRM endpoints

use crate::api::{EdmType, EntityDescriptor, FieldSpec, OperationSet};

/// Width the service right-aligns account codes to
const ACCOUNT_CODE_WIDTH: usize = 18;

pub fn account() -> EntityDescriptor {
    EntityDescriptor::new("Account", "/api/v1/{division}/crm/Accounts")
        .field(FieldSpec::new("ID", EdmType::Guid).key().read_only())
        .field(
            FieldSpec::new("Code", EdmType::FixedString(ACCOUNT_CODE_WIDTH))
                .operations(OperationSet::WRITABLE),
        )
        .field(
            FieldSpec::new("Name", EdmType::String)
                .required()
                .operations(OperationSet::WRITABLE),
        )
        .field(FieldSpec::new("Status", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Email", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Phone", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Website", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("AddressLine1", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Postcode", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("City", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Country", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("VATNumber", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("IsSupplier", EdmType::Boolean).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Blocked", EdmType::Boolean).operations(OperationSet::WRITABLE))
        .field(
            FieldSpec::new("CreditLineSales", EdmType::Double).operations(OperationSet::WRITABLE),
        )
        .field(FieldSpec::new("Division", EdmType::Int32).read_only())
        .field(FieldSpec::new("Created", EdmType::DateTime).read_only())
        .field(FieldSpec::new("Modified", EdmType::DateTime).read_only())
}
