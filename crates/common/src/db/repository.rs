//! Postgres-backed property store
//!
//! One left-joined unit -> project -> developer projection. A unit whose
//! project or developer row is missing still comes back, with those fields
//! null.

use crate::db::models::*;
use crate::db::{DbPool, PropertyStore, UnitQuery};
use crate::errors::Result;
use crate::search::Candidate;
use async_trait::async_trait;
use sea_orm::prelude::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, Order, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select,
};
use std::time::Instant;
use uuid::Uuid;

/// Flat row produced by the candidate projection
#[derive(Debug, FromQueryResult)]
struct CandidateRow {
    unit_id: Uuid,
    bedrooms: i32,
    bathrooms: Decimal,
    size_sqm: Decimal,
    price_egp: Decimal,
    unit_type: PropertyType,
    availability: Option<Availability>,
    project_name: Option<String>,
    project_name_ar: Option<String>,
    city: Option<String>,
    city_ar: Option<String>,
    district: Option<String>,
    lat: Option<Decimal>,
    lng: Option<Decimal>,
    developer_name: Option<String>,
    project_description: Option<String>,
    featured: Option<bool>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Candidate {
            unit_id: row.unit_id,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            size_sqm: row.size_sqm,
            price_egp: row.price_egp,
            unit_type: row.unit_type,
            availability: row.availability.unwrap_or(Availability::Available),
            project_name: row.project_name,
            project_name_ar: row.project_name_ar,
            city: row.city,
            city_ar: row.city_ar,
            district: row.district,
            lat: row.lat,
            lng: row.lng,
            developer_name: row.developer_name,
            project_description: row.project_description,
            featured: row.featured.unwrap_or(false),
        }
    }
}

/// Repository for catalogue reads
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }
}

/// The candidate projection with its predicates, ordering and cap
fn candidate_select(query: &UnitQuery) -> Select<UnitEntity> {
    let mut select = UnitEntity::find()
        .select_only()
        .column_as(UnitColumn::Id, "unit_id")
        .column(UnitColumn::Bedrooms)
        .column(UnitColumn::Bathrooms)
        .column(UnitColumn::SizeSqm)
        .column(UnitColumn::PriceEgp)
        .column_as(UnitColumn::UnitType, "unit_type")
        .column(UnitColumn::Availability)
        .column_as(ProjectColumn::Name, "project_name")
        .column_as(ProjectColumn::NameAr, "project_name_ar")
        .column(ProjectColumn::City)
        .column(ProjectColumn::CityAr)
        .column(ProjectColumn::District)
        .column(ProjectColumn::Lat)
        .column(ProjectColumn::Lng)
        .column_as(DeveloperColumn::Name, "developer_name")
        .column_as(ProjectColumn::Description, "project_description")
        .column(ProjectColumn::Featured)
        .join(JoinType::LeftJoin, UnitRelation::Project.def())
        .join(JoinType::LeftJoin, ProjectRelation::Developer.def())
        .filter(UnitColumn::Availability.eq(Availability::Available));

    if let Some(bedrooms) = query.bedrooms {
        select = select.filter(UnitColumn::Bedrooms.eq(i32::try_from(bedrooms).unwrap_or(i32::MAX)));
    }
    if let Some(min_price) = query.min_price {
        select = select.filter(UnitColumn::PriceEgp.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        select = select.filter(UnitColumn::PriceEgp.lte(max_price));
    }

    // Units without a project sort with the non-featured ones
    select
        .order_by(Expr::cust(r#"COALESCE("projects"."featured", FALSE)"#), Order::Desc)
        .order_by_asc(UnitColumn::PriceEgp)
        .limit(query.limit)
}

#[async_trait]
impl PropertyStore for Repository {
    async fn find_candidates(&self, query: &UnitQuery) -> Result<Vec<Candidate>> {
        let start = Instant::now();

        let rows = candidate_select(query)
            .into_model::<CandidateRow>()
            .all(self.read_conn())
            .await?;

        tracing::debug!(
            rows = rows.len(),
            bedrooms = ?query.bedrooms,
            min_price = ?query.min_price,
            max_price = ?query.max_price,
            latency_ms = start.elapsed().as_millis() as u64,
            "Candidate query completed"
        );

        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
