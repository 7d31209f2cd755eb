//! Demo catalog
//!
//! Two room types, four rooms, two extras and two discount codes. Used by
//! `--seed-demo` and by the test suite. Does nothing if room types exist.

use chrono::NaiveDate;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Set};
use tracing::info;

use super::entities::{discount_code, hotel_service, room, room_type};

/// Room ids as assigned by the seed, in insertion order.
pub const ROOM_101: i32 = 1;
pub const ROOM_102: i32 = 2;
pub const ROOM_201: i32 = 3;
pub const ROOM_202: i32 = 4;

pub const SERVICE_BREAKFAST: i32 = 1;
pub const SERVICE_AIRPORT_PICKUP: i32 = 2;

pub async fn seed_demo_catalog(db: &DatabaseConnection) -> Result<(), DbErr> {
    if room_type::Entity::find().count(db).await? > 0 {
        info!("Catalog already present, skipping demo seed");
        return Ok(());
    }

    let standard = room_type::ActiveModel {
        id: NotSet,
        name: Set("Standard Double".into()),
        base_price: Set(1_000_000),
        base_adults: Set(2),
        base_children: Set(0),
        max_adults: Set(3),
        max_children: Set(2),
        extra_adult_fee: Set(200_000),
        extra_child_fee: Set(100_000),
        refundable: Set(true),
        refund_percent: Set(80),
        refund_deadline_hours: Set(24),
    }
    .insert(db)
    .await?;

    let suite = room_type::ActiveModel {
        id: NotSet,
        name: Set("Ocean Suite".into()),
        base_price: Set(2_500_000),
        base_adults: Set(2),
        base_children: Set(1),
        max_adults: Set(4),
        max_children: Set(2),
        extra_adult_fee: Set(400_000),
        extra_child_fee: Set(150_000),
        refundable: Set(false),
        refund_percent: Set(0),
        refund_deadline_hours: Set(0),
    }
    .insert(db)
    .await?;

    for (number, type_id) in [
        ("101", standard.id),
        ("102", standard.id),
        ("201", suite.id),
        ("202", suite.id),
    ] {
        room::ActiveModel {
            id: NotSet,
            room_number: Set(number.into()),
            room_type_id: Set(type_id),
            status: Set("available".into()),
        }
        .insert(db)
        .await?;
    }

    for (name, price) in [("Breakfast buffet", 150_000), ("Airport pickup", 350_000)] {
        hotel_service::ActiveModel {
            id: NotSet,
            name: Set(name.into()),
            price: Set(price),
            is_active: Set(true),
        }
        .insert(db)
        .await?;
    }

    let open_from = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let open_until = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap_or_default();

    discount_code::ActiveModel {
        id: NotSet,
        code: Set("SUMMER20".into()),
        discount_type: Set("percent".into()),
        value: Set(20),
        min_total: Set(0),
        max_uses: Set(None),
        max_uses_per_user: Set(None),
        max_discount_amount: Set(Some(500_000)),
        start_date: Set(open_from),
        end_date: Set(open_until),
        status: Set("active".into()),
        used_count: Set(0),
    }
    .insert(db)
    .await?;

    discount_code::ActiveModel {
        id: NotSet,
        code: Set("WELCOME".into()),
        discount_type: Set("fixed".into()),
        value: Set(500_000),
        min_total: Set(0),
        max_uses: Set(Some(1_000)),
        max_uses_per_user: Set(Some(1)),
        max_discount_amount: Set(None),
        start_date: Set(open_from),
        end_date: Set(open_until),
        status: Set("active".into()),
        used_count: Set(0),
    }
    .insert(db)
    .await?;

    info!("🌱 Demo catalog seeded (4 rooms, 2 services, 2 discount codes)");
    Ok(())
}
