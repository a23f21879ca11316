//! Schema declarations for every content kind the directorate manages.

use std::sync::Arc;

use directorate_common::schema::{
    AttachmentField, KindSchema, ListOrder, LocalizedField, ScalarField,
};
use directorate_common::storage::UploadStore;
use sea_orm::DatabaseConnection;

use crate::repository::SeaOrmRepository;
use crate::service::{ContentRegistry, ContentService};

pub static LEADER: KindSchema = KindSchema {
    name: "leader",
    plural: "leaders",
    label: "Leader",
    localized: &[
        LocalizedField::required("fullName"),
        LocalizedField::optional("position"),
    ],
    scalars: &[ScalarField::text("phone"), ScalarField::text("email")],
    attachments: &[AttachmentField::single("photo", "photos")],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static SERVICE: KindSchema = KindSchema {
    name: "service",
    plural: "services",
    label: "Service",
    localized: &[
        LocalizedField::required("title"),
        LocalizedField::required("description"),
    ],
    scalars: &[],
    attachments: &[],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static RELATION: KindSchema = KindSchema {
    name: "relation",
    plural: "relations",
    label: "Relation",
    localized: &[
        LocalizedField::required("title"),
        LocalizedField::required("description"),
    ],
    scalars: &[],
    attachments: &[AttachmentField::gallery("photos", "photos", "deletedPhotos")],
    order: ListOrder::NewestFirst,
    public_gate: None,
};

pub static CHARTER: KindSchema = KindSchema {
    name: "charter",
    plural: "charters",
    label: "Charter",
    localized: &[
        LocalizedField::required("title"),
        LocalizedField::required("description"),
        LocalizedField::required("signatory"),
    ],
    scalars: &[ScalarField::flag("active", false)],
    attachments: &[AttachmentField::single("file", "files")],
    order: ListOrder::Insertion,
    public_gate: Some("active"),
};

pub static TASK: KindSchema = KindSchema {
    name: "task",
    plural: "tasks",
    label: "Task",
    localized: &[LocalizedField::optional("description")],
    scalars: &[],
    attachments: &[],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static EGOVERNMENT: KindSchema = KindSchema {
    name: "egovernment",
    plural: "egovernments",
    label: "E-government link",
    localized: &[LocalizedField::required("title")],
    scalars: &[ScalarField::text("url")],
    attachments: &[],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static STRUCTURE: KindSchema = KindSchema {
    name: "structure",
    plural: "structures",
    label: "Structure",
    localized: &[LocalizedField::optional("title")],
    scalars: &[],
    attachments: &[
        AttachmentField::single("photo", "photos"),
        AttachmentField::single("file", "files"),
    ],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static REKVIZIT: KindSchema = KindSchema {
    name: "rekvizit",
    plural: "rekvizits",
    label: "Rekvizit",
    localized: &[
        LocalizedField::optional("location").viewed_as("title"),
        LocalizedField::optional("description"),
    ],
    scalars: &[
        ScalarField::text("faks_number"),
        ScalarField::text("phone_number"),
    ],
    attachments: &[],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static EMPLOYER: KindSchema = KindSchema {
    name: "employer",
    plural: "employers",
    label: "Employer",
    localized: &[
        LocalizedField::required("fullName"),
        LocalizedField::optional("position"),
    ],
    scalars: &[ScalarField::text("phone")],
    attachments: &[],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static LANDAREA: KindSchema = KindSchema {
    name: "landarea",
    plural: "landareas",
    label: "Land area",
    localized: &[
        LocalizedField::optional("title"),
        LocalizedField::optional("empty_area"),
        LocalizedField::optional("total_area"),
    ],
    scalars: &[],
    attachments: &[AttachmentField::single("photo", "photos")],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static PROJECT: KindSchema = KindSchema {
    name: "project",
    plural: "projects",
    label: "Project",
    localized: &[
        LocalizedField::optional("companyName"),
        LocalizedField::optional("projectName"),
        LocalizedField::optional("contact"),
    ],
    scalars: &[ScalarField::choice(
        "status",
        &["completed", "ongoing", "offer"],
    )],
    attachments: &[],
    order: ListOrder::Insertion,
    public_gate: None,
};

pub static ALL_KINDS: &[&KindSchema] = &[
    &LEADER,
    &SERVICE,
    &RELATION,
    &CHARTER,
    &TASK,
    &EGOVERNMENT,
    &STRUCTURE,
    &REKVIZIT,
    &EMPLOYER,
    &LANDAREA,
    &PROJECT,
];

/// One service per kind, each with its own repository over the shared pool.
pub fn build_registry(db: &DatabaseConnection, uploads: Arc<dyn UploadStore>) -> ContentRegistry {
    let mut registry = ContentRegistry::default();
    for &schema in ALL_KINDS {
        let repo = SeaOrmRepository::new(db.clone(), schema.name, schema.order);
        registry.insert(ContentService::new(schema, Arc::new(repo), uploads.clone()));
    }
    registry
}
