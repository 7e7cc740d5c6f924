//! SeaORM entity models
//!
//! Read-side entities for the property catalogue

mod developer;
mod project;
mod unit;

pub use developer::{
    Entity as DeveloperEntity,
    Model as Developer,
    ActiveModel as DeveloperActiveModel,
    Column as DeveloperColumn,
};

pub use project::{
    Entity as ProjectEntity,
    Model as Project,
    ActiveModel as ProjectActiveModel,
    Column as ProjectColumn,
    Relation as ProjectRelation,
};

pub use unit::{
    Entity as UnitEntity,
    Model as Unit,
    ActiveModel as UnitActiveModel,
    Column as UnitColumn,
    Relation as UnitRelation,
    Availability,
    PropertyType,
};
