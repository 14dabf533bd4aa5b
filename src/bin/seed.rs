use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use storefront_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    models::{ROLE_ADMIN, ROLE_USER},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "Store Admin", "admin@example.com", "admin123", ROLE_ADMIN).await?;
    let user_id = ensure_user(&orm, "Demo Shopper", "user@example.com", "user123", ROLE_USER).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        let id = existing.id;
        if existing.role != role {
            let mut active: UserActive = existing.into();
            active.role = Set(role.to_string());
            active.update(orm).await?;
        }
        println!("Ensured user {email} (role={role})");
        return Ok(id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Created user {email} (role={role})");
    Ok(user.id)
}
