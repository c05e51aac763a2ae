//! Financial endpoints

use crate::api::{EdmType, EntityDescriptor, FieldSpec, OperationSet};

pub fn gl_account() -> EntityDescriptor {
    EntityDescriptor::new("GLAccount", "/api/v1/{division}/financial/GLAccounts")
        .field(FieldSpec::new("ID", EdmType::Guid).key().read_only())
        // Code and type are fixed once the account exists
        .field(
            FieldSpec::new("Code", EdmType::String)
                .required()
                .operations(OperationSet::READ_CREATE),
        )
        .field(
            FieldSpec::new("Description", EdmType::String)
                .required()
                .operations(OperationSet::WRITABLE),
        )
        .field(
            FieldSpec::new("Type", EdmType::Int32)
                .required()
                .operations(OperationSet::READ_CREATE),
        )
        .field(FieldSpec::new("BalanceSide", EdmType::String).operations(OperationSet::READ_CREATE))
        .field(FieldSpec::new("BalanceType", EdmType::String).operations(OperationSet::READ_CREATE))
        .field(FieldSpec::new("Blocked", EdmType::Boolean).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Costcenter", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Costunit", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("SearchCode", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("VATCode", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("Division", EdmType::Int32).read_only())
        .field(FieldSpec::new("Created", EdmType::DateTime).read_only())
        .field(FieldSpec::new("Modified", EdmType::DateTime).read_only())
}
