//! System endpoints: the current user and divisions

use crate::api::{EdmType, EntityDescriptor, FieldSpec, OperationSet};

/// `/current/Me`, used to resolve the default division
pub fn me() -> EntityDescriptor {
    let fields = [
        ("UserID", EdmType::Guid),
        ("CurrentDivision", EdmType::Int32),
        ("AccountingDivision", EdmType::Int32),
        ("DivisionCustomer", EdmType::Guid),
        ("DivisionCustomerCode", EdmType::String),
        ("DivisionCustomerName", EdmType::String),
        ("Email", EdmType::String),
        ("FirstName", EdmType::String),
        ("MiddleName", EdmType::String),
        ("LastName", EdmType::String),
        ("FullName", EdmType::String),
        ("Initials", EdmType::String),
        ("Title", EdmType::String),
        ("Language", EdmType::String),
        ("LanguageCode", EdmType::String),
        ("Legislation", EdmType::Int64),
        ("Nationality", EdmType::String),
        ("Mobile", EdmType::String),
        ("Phone", EdmType::String),
        ("PictureUrl", EdmType::String),
        ("ThumbnailPicture", EdmType::Binary),
        ("ThumbnailPictureFormat", EdmType::String),
        ("ServerTime", EdmType::String),
        ("ServerUtcOffset", EdmType::Double),
        ("UserName", EdmType::String),
    ];

    fields.into_iter().fold(
        EntityDescriptor::new("Me", "/api/v1/current/Me")
            .page_size(1)
            .methods(OperationSet::READ),
        |descriptor, (name, edm_type)| {
            let field = FieldSpec::new(name, edm_type).read_only();
            descriptor.field(if name == "UserID" { field.key() } else { field })
        },
    )
}

pub fn division() -> EntityDescriptor {
    EntityDescriptor::new("Division", "/api/v1/{division}/hrm/Divisions")
        .methods(OperationSet::READ)
        .field(FieldSpec::new("Code", EdmType::Int32).key().read_only())
        .field(FieldSpec::new("Customer", EdmType::Guid).read_only())
        .field(FieldSpec::new("CustomerCode", EdmType::String).read_only())
        .field(FieldSpec::new("CustomerName", EdmType::String).read_only())
        .field(FieldSpec::new("Description", EdmType::String).read_only())
        .field(FieldSpec::new("HID", EdmType::Int64).read_only())
        .field(FieldSpec::new("Main", EdmType::Boolean).read_only())
        .field(FieldSpec::new("Status", EdmType::Int32).read_only())
        .field(FieldSpec::new("BlockingStatus", EdmType::Int32).read_only())
        .field(FieldSpec::new("Country", EdmType::String).read_only())
        .field(FieldSpec::new("Currency", EdmType::String).read_only())
        .field(FieldSpec::new("StartDate", EdmType::DateTime).read_only())
        .field(FieldSpec::new("Created", EdmType::DateTime).read_only())
        .field(FieldSpec::new("Modified", EdmType::DateTime).read_only())
}
