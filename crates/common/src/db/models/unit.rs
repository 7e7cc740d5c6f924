//! Unit entity with availability tracking

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "availability")]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "sold")]
    Sold,
}

/// Kind of dwelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "property_type")]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[sea_orm(string_value = "apartment")]
    Apartment,
    #[sea_orm(string_value = "villa")]
    Villa,
    #[sea_orm(string_value = "penthouse")]
    Penthouse,
    #[sea_orm(string_value = "townhouse")]
    Townhouse,
    #[sea_orm(string_value = "twin")]
    Twin,
    #[sea_orm(string_value = "studio")]
    Studio,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "units")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub project_id: Uuid,

    pub unit_number: Option<String>,

    #[sea_orm(column_name = "type")]
    pub unit_type: PropertyType,

    pub bedrooms: i32,

    /// NUMERIC(3,1)
    #[sea_orm(column_type = "Decimal(Some((3, 1)))")]
    pub bathrooms: Decimal,

    /// NUMERIC(10,2)
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub size_sqm: Decimal,

    /// NUMERIC(12,2)
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price_egp: Decimal,

    pub availability: Option<Availability>,

    pub created_at: DateTime,

    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
