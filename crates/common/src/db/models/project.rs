//! Project entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub developer_id: Uuid,

    pub name: String,

    pub name_ar: Option<String>,

    #[sea_orm(unique)]
    pub slug: String,

    pub city: String,

    pub city_ar: Option<String>,

    pub district: String,

    pub district_ar: Option<String>,

    /// NUMERIC(10,7)
    #[sea_orm(column_type = "Decimal(Some((10, 7)))")]
    pub lat: Decimal,

    /// NUMERIC(10,7)
    #[sea_orm(column_type = "Decimal(Some((10, 7)))")]
    pub lng: Decimal,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description_ar: Option<String>,

    pub featured: Option<bool>,

    pub created_at: DateTime,

    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::developer::Entity",
        from = "Column::DeveloperId",
        to = "super::developer::Column::Id"
    )]
    Developer,

    #[sea_orm(has_many = "super::unit::Entity")]
    Units,
}

impl Related<super::developer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Developer.def()
    }
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Units.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
