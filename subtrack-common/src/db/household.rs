use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::household::{Household, NewHousehold};
use crate::models::household_member::{HouseholdMember, HouseholdRole, NewHouseholdMember};
use crate::models::user::User;
use crate::schema::household_members as household_member_fields;
use crate::schema::household_members::dsl::household_members;
use crate::schema::households as household_fields;
use crate::schema::households::dsl::households;
use crate::schema::subscriptions as subscription_fields;
use crate::schema::subscriptions::dsl::subscriptions;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Creates a household with the user as its owner. A user who already
    /// belongs to a household must leave it first.
    pub fn create_household(&mut self, name: &str, owner_user_id: Uuid) -> Result<Household, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<Household, DaoError, _>(|conn| {
                let owner = users.find(owner_user_id).get_result::<User>(conn)?;

                if owner.household_id.is_some() {
                    return Err(DaoError::WontRunQuery);
                }

                let current_time = SystemTime::now();
                let new_household = NewHousehold {
                    id: Uuid::now_v7(),
                    name,
                    owner_user_id,
                    created_timestamp: current_time,
                };

                let household = dsl::insert_into(households)
                    .values(&new_household)
                    .get_result::<Household>(conn)?;

                let owner_membership = NewHouseholdMember {
                    user_id: owner_user_id,
                    household_id: household.id,
                    role: HouseholdRole::Owner,
                    joined_timestamp: current_time,
                };

                dsl::insert_into(household_members)
                    .values(&owner_membership)
                    .execute(conn)?;

                dsl::update(users.find(owner_user_id))
                    .set(user_fields::household_id.eq(household.id))
                    .execute(conn)?;

                Ok(household)
            })
    }

    pub fn get_household(&mut self, household_id: Uuid) -> Result<Household, DaoError> {
        Ok(households
            .find(household_id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    /// The household the user belongs to, with every member's email address.
    pub fn get_household_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<(Household, Vec<(HouseholdMember, String)>), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<(Household, Vec<(HouseholdMember, String)>), DaoError, _>(|conn| {
                let user = users.find(user_id).get_result::<User>(conn)?;
                let household_id = match user.household_id {
                    Some(id) => id,
                    None => return Err(DaoError::QueryFailure(diesel::result::Error::NotFound)),
                };

                let household = households.find(household_id).get_result::<Household>(conn)?;

                let members = household_members
                    .inner_join(users)
                    .filter(household_member_fields::household_id.eq(household_id))
                    .order(household_member_fields::joined_timestamp.asc())
                    .select((
                        household_member_fields::all_columns,
                        user_fields::email,
                    ))
                    .load::<(HouseholdMember, String)>(conn)?;

                Ok((household, members))
            })
    }

    /// Adds the user to a household after an invite token has been verified.
    /// Re-accepting an invite to the user's current household is a no-op.
    /// A user who belongs to a different household cannot accept.
    pub fn add_member(&mut self, household_id: Uuid, user_id: Uuid) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<(), DaoError, _>(|conn| {
                let user = users.find(user_id).get_result::<User>(conn)?;

                match user.household_id {
                    Some(current) if current == household_id => return Ok(()),
                    Some(_) => return Err(DaoError::WontRunQuery),
                    None => (),
                }

                households.find(household_id).get_result::<Household>(conn)?;

                let membership = NewHouseholdMember {
                    user_id,
                    household_id,
                    role: HouseholdRole::Member,
                    joined_timestamp: SystemTime::now(),
                };

                dsl::insert_into(household_members)
                    .values(&membership)
                    .execute(conn)?;

                dsl::update(users.find(user_id))
                    .set(user_fields::household_id.eq(household_id))
                    .execute(conn)?;

                Ok(())
            })
    }

    /// Removes the user from their household. When the owner leaves, the
    /// household is disbanded, every member is detached, and shared
    /// subscriptions revert to personal ones.
    pub fn leave_household(&mut self, user_id: Uuid) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<(), DaoError, _>(|conn| {
                let user = users.find(user_id).get_result::<User>(conn)?;
                let household_id = match user.household_id {
                    Some(id) => id,
                    None => return Err(DaoError::QueryFailure(diesel::result::Error::NotFound)),
                };

                let household = households.find(household_id).get_result::<Household>(conn)?;

                if household.owner_user_id == user_id {
                    dsl::update(
                        subscriptions
                            .filter(subscription_fields::household_id.eq(household_id)),
                    )
                    .set(subscription_fields::household_id.eq(None::<Uuid>))
                    .execute(conn)?;

                    dsl::update(users.filter(user_fields::household_id.eq(household_id)))
                        .set(user_fields::household_id.eq(None::<Uuid>))
                        .execute(conn)?;

                    dsl::delete(
                        household_members
                            .filter(household_member_fields::household_id.eq(household_id)),
                    )
                    .execute(conn)?;

                    dsl::delete(households.find(household_id)).execute(conn)?;
                } else {
                    dsl::update(
                        subscriptions
                            .filter(subscription_fields::user_id.eq(user_id))
                            .filter(subscription_fields::household_id.eq(household_id)),
                    )
                    .set(subscription_fields::household_id.eq(None::<Uuid>))
                    .execute(conn)?;

                    dsl::delete(household_members.find(user_id)).execute(conn)?;

                    dsl::update(users.find(user_id))
                        .set(user_fields::household_id.eq(None::<Uuid>))
                        .execute(conn)?;
                }

                Ok(())
            })
    }
}
