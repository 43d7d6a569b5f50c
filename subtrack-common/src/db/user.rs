use diesel::{dsl, AsChangeset, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::user::{NewUser, User};
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

#[derive(AsChangeset)]
#[diesel(table_name = user_fields)]
pub struct UserPrefsChangeset<'a> {
    pub display_currency: Option<&'a str>,
    pub email_reminders_enabled: Option<bool>,
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_user(
        &mut self,
        email: &str,
        auth_string_hash: &str,
        display_currency: &str,
    ) -> Result<User, DaoError> {
        let new_user = NewUser {
            id: Uuid::now_v7(),
            email,
            auth_string_hash,
            display_currency,
            household_id: None,
            email_reminders_enabled: true,
            created_timestamp: SystemTime::now(),
        };

        Ok(dsl::insert_into(users)
            .values(&new_user)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_by_id(&mut self, user_id: Uuid) -> Result<User, DaoError> {
        Ok(users
            .find(user_id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_by_email(&mut self, email: &str) -> Result<User, DaoError> {
        Ok(users
            .filter(user_fields::email.eq(email))
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn update_user_prefs(
        &mut self,
        user_id: Uuid,
        prefs: UserPrefsChangeset,
    ) -> Result<User, DaoError> {
        Ok(dsl::update(users.find(user_id))
            .set(prefs)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }
}
