//! Sales invoice endpoints

use crate::api::{EdmType, EntityDescriptor, FieldSpec, OperationSet};

pub fn sales_invoice() -> EntityDescriptor {
    EntityDescriptor::new("SalesInvoice", "/api/v1/{division}/salesinvoice/SalesInvoices")
        .field(FieldSpec::new("InvoiceID", EdmType::Guid).key().read_only())
        .field(FieldSpec::new("InvoiceNumber", EdmType::Int32).read_only())
        .field(
            FieldSpec::new("OrderedBy", EdmType::Guid)
                .required()
                .operations(OperationSet::READ_CREATE),
        )
        .field(FieldSpec::new("InvoiceTo", EdmType::Guid).operations(OperationSet::READ_CREATE))
        .field(
            FieldSpec::new("Journal", EdmType::String)
                .required()
                .operations(OperationSet::READ_CREATE),
        )
        .field(FieldSpec::new("Currency", EdmType::String).operations(OperationSet::READ_CREATE))
        .field(FieldSpec::new("Description", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("InvoiceDate", EdmType::DateTime).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("YourRef", EdmType::String).operations(OperationSet::WRITABLE))
        .field(FieldSpec::new("AmountDC", EdmType::Double).read_only())
        .field(FieldSpec::new("VATAmountDC", EdmType::Double).read_only())
        .field(FieldSpec::new("Status", EdmType::Int16).read_only())
        .field(
            FieldSpec::new("SalesInvoiceLines", EdmType::Collection("SalesInvoiceLine".into()))
                .operations(OperationSet::READ_CREATE),
        )
}

pub fn sales_invoice_line() -> EntityDescriptor {
    EntityDescriptor::new(
        "SalesInvoiceLine",
        "/api/v1/{division}/salesinvoice/SalesInvoiceLines",
    )
    .field(FieldSpec::new("ID", EdmType::Guid).key().read_only())
    .field(FieldSpec::new("InvoiceID", EdmType::Guid).operations(OperationSet::READ_CREATE))
    .field(
        FieldSpec::new("Item", EdmType::Guid)
            .required()
            .operations(OperationSet::READ_CREATE),
    )
    .field(FieldSpec::new("Description", EdmType::String).operations(OperationSet::WRITABLE))
    .field(FieldSpec::new("Quantity", EdmType::Double).operations(OperationSet::WRITABLE))
    .field(FieldSpec::new("UnitPrice", EdmType::Double).operations(OperationSet::WRITABLE))
    .field(FieldSpec::new("VATCode", EdmType::String).operations(OperationSet::WRITABLE))
    .field(FieldSpec::new("AmountDC", EdmType::Double).read_only())
    .field(FieldSpec::new("LineNumber", EdmType::Int32).read_only())
}
