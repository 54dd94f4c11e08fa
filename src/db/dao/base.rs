use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, PrimaryKeyTrait, QueryFilter, QueryOrder, Select,
    prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::base_traits::{
    HasCreatedAtColumn, HasExpiryColumn, HasIdActiveModel, HasOwnerColumn,
    TimestampedActiveModel,
};
use super::error::{DaoLayerError, DaoResult};

#[async_trait::async_trait]
pub trait DaoBase: Clone + Send + Sync + Sized
where
    <Self::Entity as EntityTrait>::Model:
        FromQueryResult + IntoActiveModel<<Self::Entity as EntityTrait>::ActiveModel> + Send + Sync,
    <Self::Entity as EntityTrait>::ActiveModel:
        ActiveModelTrait<Entity = Self::Entity> + HasIdActiveModel + TimestampedActiveModel + Send,
    <<Self::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType:
        From<Uuid> + Send + Sync,
    Self::Entity: HasCreatedAtColumn,
{
    type Entity: EntityTrait + Send + Sync;

    fn from_db(db: DatabaseConnection) -> Self;

    fn new(db: &DatabaseConnection) -> Self {
        Self::from_db(db.clone())
    }

    fn db(&self) -> &DatabaseConnection;

    async fn create(
        &self,
        data: impl IntoActiveModel<<Self::Entity as EntityTrait>::ActiveModel> + Send,
    ) -> DaoResult<<Self::Entity as EntityTrait>::Model> {
        let now = Utc::now().fixed_offset();
        let mut active = data.into_active_model();
        active.set_id(Uuid::new_v4());
        active.set_created_at(now);
        active.set_updated_at(now);
        active.insert(self.db()).await.map_err(DaoLayerError::from)
    }

    /// Newest row matching `apply`.
    async fn find_one(
        &self,
        apply: impl FnOnce(Select<Self::Entity>) -> Select<Self::Entity> + Send,
    ) -> DaoResult<Option<<Self::Entity as EntityTrait>::Model>> {
        apply(Self::Entity::find())
            .order_by_desc(Self::Entity::created_at_column())
            .one(self.db())
            .await
            .map_err(DaoLayerError::from)
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> DaoResult<<Self::Entity as EntityTrait>::Model>
    where
        F: for<'a> FnOnce(&'a mut <Self::Entity as EntityTrait>::ActiveModel) + Send,
    {
        let model = Self::Entity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(DaoLayerError::from)?
            .ok_or(DaoLayerError::NotFound {
                entity: std::any::type_name::<Self::Entity>(),
                id,
            })?;

        let mut active = model.into_active_model();
        apply(&mut active);
        active.set_updated_at(Utc::now().fixed_offset());

        active.update(self.db()).await.map_err(DaoLayerError::from)
    }

    /// Deletes every row owned by `owner_id` in one statement.
    async fn delete_owned_by(&self, owner_id: Uuid) -> DaoResult<u64>
    where
        Self::Entity: HasOwnerColumn,
    {
        Self::Entity::delete_many()
            .filter(Self::Entity::owner_column().eq(owner_id))
            .exec(self.db())
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::from)
    }

    async fn delete_expired_before(&self, now: DateTimeWithTimeZone) -> DaoResult<u64>
    where
        Self::Entity: HasExpiryColumn,
    {
        Self::Entity::delete_many()
            .filter(Self::Entity::expiry_column().lte(now))
            .exec(self.db())
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::from)
    }
}
