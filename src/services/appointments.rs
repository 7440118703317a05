//! Appointment booking.
//!
//! A booking is accepted when its date and time lie in the future, the time
//! falls inside clinic hours, and no other appointment holds the exact same
//! (date, time) slot. The slot rules are enforced here, again in the
//! entity's `before_save`, and finally by a unique index.

use crate::{
    config::ClinicConfig,
    entities::{
        appointment::{self, Entity as Appointment, PetType, SLOT_IN_PAST, SLOT_TAKEN},
        consultation::{self, Entity as Consultation},
        pet::{self, Entity as Pet},
        user,
    },
    errors::{is_unique_violation, FormErrors, ServiceError},
};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const REQUIRED: &str = "This field is required.";
const DATE_IN_PAST: &str = "The date cannot be in the past.";
const DATETIME_IN_PAST: &str = "The selected date and time have already passed.";

/// Accepts `HH:MM` as well as `HH:MM:SS`.
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(raw.trim())
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time '{}', expected HH:MM", raw))),
        }
    }
}

/// Booking form. Every field is optional at the wire level so that missing
/// values are reported as field errors instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct AppointmentInput {
    #[validate(length(max = 100, message = "Pet name must be at most 100 characters."))]
    pub pet_name: Option<String>,
    pub pet_type: Option<PetType>,
    #[validate(length(max = 100, message = "Holder name must be at most 100 characters."))]
    pub holder_name: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "clock_time::deserialize_opt")]
    #[schema(value_type = Option<String>, example = "10:30")]
    pub time: Option<NaiveTime>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentFilter {
    #[default]
    All,
    /// Today onwards.
    Pending,
    Past,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Agenda {
    pub date: NaiveDate,
    #[schema(value_type = Vec<Object>)]
    pub appointments: Vec<appointment::Model>,
    #[schema(value_type = Vec<Object>)]
    pub upcoming: Vec<appointment::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentDetail {
    #[schema(value_type = Object)]
    pub appointment: appointment::Model,
    #[schema(value_type = Option<Object>)]
    pub consultation: Option<consultation::Model>,
    #[schema(value_type = Option<Object>)]
    pub pet: Option<pet::Model>,
}

/// Message shown when a slot is already taken.
pub fn slot_taken_message(date: NaiveDate, time: NaiveTime) -> String {
    format!(
        "An appointment is already booked for {} at {}. Please choose another date or time.",
        date.format("%d/%m/%Y"),
        time.format("%H:%M")
    )
}

/// Date and hour rules for a slot, checked against `now`.
///
/// A past date is reported on `date` and a past date+time as a form error;
/// either stops validation. Out-of-hours times are reported on `time`.
pub fn validate_slot(
    date: NaiveDate,
    time: NaiveTime,
    now: NaiveDateTime,
    clinic: &ClinicConfig,
) -> FormErrors {
    let mut errors = FormErrors::new();

    if date < now.date() {
        errors.add_field("date", DATE_IN_PAST);
        return errors;
    }
    if date.and_time(time) < now {
        errors.add_non_field(DATETIME_IN_PAST);
        return errors;
    }

    if time < clinic.opens_at {
        errors.add_field(
            "time",
            format!(
                "Appointments can only be booked from {}.",
                clinic.opens_at.format("%H:%M")
            ),
        );
    } else if time > clinic.closes_at {
        errors.add_field(
            "time",
            format!(
                "Appointments can only be booked until {}.",
                clinic.closes_at.format("%H:%M")
            ),
        );
    }

    errors
}

/// Every bookable start time of a clinic day.
pub fn day_slots(clinic: &ClinicConfig) -> Vec<NaiveTime> {
    let step = Duration::minutes(i64::from(clinic.slot_minutes.max(1)));
    let mut slots = Vec::new();
    let mut current = clinic.opens_at;
    while current <= clinic.closes_at {
        slots.push(current);
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 || next <= current {
            break;
        }
        current = next;
    }
    slots
}

/// A validated booking request.
struct Slot {
    pet_name: String,
    pet_type: PetType,
    holder_name: Option<String>,
    date: NaiveDate,
    time: NaiveTime,
    reason: Option<String>,
}

#[derive(Clone)]
pub struct AppointmentService {
    db: Arc<DatabaseConnection>,
    clinic: ClinicConfig,
}

impl AppointmentService {
    pub fn new(db: Arc<DatabaseConnection>, clinic: ClinicConfig) -> Self {
        Self { db, clinic }
    }

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    /// Runs the full booking validation. `editing` excludes that
    /// appointment from the duplicate check.
    async fn check(
        &self,
        input: &AppointmentInput,
        editing: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Slot, ServiceError> {
        let mut errors = match input.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        let pet_name = super::non_blank(input.pet_name.clone());
        if pet_name.is_none() {
            errors.add_field("pet_name", REQUIRED);
        }
        if input.pet_type.is_none() {
            errors.add_field("pet_type", REQUIRED);
        }
        if input.date.is_none() {
            errors.add_field("date", REQUIRED);
        }
        if input.time.is_none() {
            errors.add_field("time", REQUIRED);
        }

        let (Some(pet_name), Some(pet_type), Some(date), Some(time)) =
            (pet_name, input.pet_type, input.date, input.time)
        else {
            return Err(errors.into());
        };

        let slot_errors = validate_slot(date, time, now, &self.clinic);
        let stop = slot_errors.has_field("date") || !slot_errors.non_field.is_empty();
        errors.merge(slot_errors);

        if !stop && self.slot_taken(date, time, editing).await? {
            errors.add_non_field(slot_taken_message(date, time));
        }
        errors.into_result()?;

        Ok(Slot {
            pet_name,
            pet_type,
            holder_name: super::non_blank(input.holder_name.clone()),
            date,
            time,
            reason: super::non_blank(input.reason.clone()),
        })
    }

    async fn slot_taken(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        except: Option<Uuid>,
    ) -> Result<bool, ServiceError> {
        let mut query = Appointment::find()
            .filter(appointment::Column::Date.eq(date))
            .filter(appointment::Column::Time.eq(time));
        if let Some(id) = except {
            query = query.filter(appointment::Column::Id.ne(id));
        }
        Ok(query.one(&*self.db).await?.is_some())
    }

    pub async fn book(
        &self,
        owner: &user::Model,
        input: AppointmentInput,
    ) -> Result<appointment::Model, ServiceError> {
        self.book_at(owner, input, Self::now()).await
    }

    #[instrument(skip(self, owner, input), fields(owner_id = %owner.id))]
    pub async fn book_at(
        &self,
        owner: &user::Model,
        input: AppointmentInput,
        now: NaiveDateTime,
    ) -> Result<appointment::Model, ServiceError> {
        let slot = self.check(&input, None, now).await?;
        let (date, time) = (slot.date, slot.time);

        let model = appointment::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner.id),
            pet_name: Set(slot.pet_name),
            pet_type: Set(slot.pet_type),
            holder_name: Set(Some(
                slot.holder_name.unwrap_or_else(|| owner.display_name()),
            )),
            date: Set(date),
            time: Set(time),
            reason: Set(slot.reason),
            created_at: Set(Utc::now()),
        };

        let booked = model
            .insert(&*self.db)
            .await
            .map_err(|err| slot_error(err, date, time))?;

        counter!("vetclinic.appointments_booked", 1);
        info!(appointment_id = %booked.id, %date, %time, "appointment booked");
        Ok(booked)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: AppointmentInput,
    ) -> Result<appointment::Model, ServiceError> {
        let existing = self.get(id).await?;
        let slot = self.check(&input, Some(id), Self::now()).await?;
        let (date, time) = (slot.date, slot.time);

        let mut active = existing.into_active_model();
        active.pet_name = Set(slot.pet_name);
        active.pet_type = Set(slot.pet_type);
        if let Some(holder) = slot.holder_name {
            active.holder_name = Set(Some(holder));
        }
        active.date = Set(date);
        active.time = Set(time);
        active.reason = Set(slot.reason);

        let updated = active
            .update(&*self.db)
            .await
            .map_err(|err| slot_error(err, date, time))?;
        info!(appointment_id = %updated.id, %date, %time, "appointment updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Appointment::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Appointment", id));
        }
        info!(appointment_id = %id, "appointment deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<appointment::Model, ServiceError> {
        Appointment::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Appointment", id))
    }

    /// The owner's bookings in chronological order.
    pub async fn mine(&self, owner_id: Uuid) -> Result<Vec<appointment::Model>, ServiceError> {
        Ok(Appointment::find()
            .filter(appointment::Column::OwnerId.eq(owner_id))
            .order_by_asc(appointment::Column::Date)
            .order_by_asc(appointment::Column::Time)
            .all(&*self.db)
            .await?)
    }

    pub async fn available_hours(&self, date: NaiveDate) -> Result<Vec<NaiveTime>, ServiceError> {
        self.available_hours_at(date, Self::now()).await
    }

    /// Free slots of `date`; past days have none and today's elapsed slots
    /// are skipped.
    pub async fn available_hours_at(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<NaiveTime>, ServiceError> {
        if date < now.date() {
            return Ok(Vec::new());
        }

        let booked: Vec<NaiveTime> = Appointment::find()
            .filter(appointment::Column::Date.eq(date))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|a| a.time)
            .collect();

        Ok(day_slots(&self.clinic)
            .into_iter()
            .filter(|slot| !booked.contains(slot))
            .filter(|slot| date > now.date() || *slot > now.time())
            .collect())
    }

    /// One day's bookings plus the next few days' look-ahead.
    #[instrument(skip(self))]
    pub async fn agenda(&self, date: NaiveDate) -> Result<Agenda, ServiceError> {
        let appointments = Appointment::find()
            .filter(appointment::Column::Date.eq(date))
            .order_by_asc(appointment::Column::Time)
            .all(&*self.db)
            .await?;

        let horizon = date + Duration::days(self.clinic.agenda_upcoming_days);
        let upcoming = Appointment::find()
            .filter(appointment::Column::Date.gt(date))
            .filter(appointment::Column::Date.lte(horizon))
            .order_by_asc(appointment::Column::Date)
            .order_by_asc(appointment::Column::Time)
            .limit(self.clinic.agenda_upcoming_limit)
            .all(&*self.db)
            .await?;

        Ok(Agenda {
            date,
            appointments,
            upcoming,
        })
    }

    pub async fn list(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<appointment::Model>, ServiceError> {
        self.list_on(filter, Local::now().date_naive()).await
    }

    /// Newest first; `today` splits pending from past.
    pub async fn list_on(
        &self,
        filter: AppointmentFilter,
        today: NaiveDate,
    ) -> Result<Vec<appointment::Model>, ServiceError> {
        let mut query = Appointment::find();
        match filter {
            AppointmentFilter::All => {}
            AppointmentFilter::Pending => {
                query = query.filter(appointment::Column::Date.gte(today));
            }
            AppointmentFilter::Past => {
                query = query.filter(appointment::Column::Date.lt(today));
            }
        }
        Ok(query
            .order_by_desc(appointment::Column::Date)
            .order_by_desc(appointment::Column::Time)
            .all(&*self.db)
            .await?)
    }

    /// The appointment, the consultation opened from it and the owner's pet
    /// of the same name, when those exist.
    #[instrument(skip(self))]
    pub async fn detail(&self, id: Uuid) -> Result<AppointmentDetail, ServiceError> {
        let appointment = self.get(id).await?;

        let consultation = Consultation::find()
            .filter(consultation::Column::AppointmentId.eq(id))
            .order_by_asc(consultation::Column::ConsultedAt)
            .one(&*self.db)
            .await?;

        let pet = Pet::find()
            .filter(pet::Column::Name.eq(appointment.pet_name.as_str()))
            .filter(pet::Column::OwnerId.eq(appointment.owner_id))
            .one(&*self.db)
            .await?;

        Ok(AppointmentDetail {
            appointment,
            consultation,
            pet,
        })
    }
}

/// Maps persistence-layer refusals onto the same form errors the service
/// check produces.
fn slot_error(err: DbErr, date: NaiveDate, time: NaiveTime) -> ServiceError {
    match &err {
        DbErr::Custom(msg) if msg == SLOT_TAKEN => {
            FormErrors::form(slot_taken_message(date, time)).into()
        }
        DbErr::Custom(msg) if msg == SLOT_IN_PAST => FormErrors::form(DATETIME_IN_PAST).into(),
        _ if is_unique_violation(&err) => FormErrors::form(slot_taken_message(date, time)).into(),
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(date: (i32, u32, u32), hm: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(hm.0, hm.1, 0)
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(t(9, 0), true)]
    #[case(t(18, 0), true)]
    #[case(t(12, 30), true)]
    #[case(t(8, 59), false)]
    #[case(t(18, 1), false)]
    fn clinic_hours_are_inclusive(#[case] time: NaiveTime, #[case] ok: bool) {
        let now = at((2030, 1, 1), (7, 0));
        let errors = validate_slot(d(2030, 1, 2), time, now, &ClinicConfig::default());
        assert_eq!(errors.is_empty(), ok);
        if !ok {
            assert!(errors.has_field("time"));
        }
    }

    #[test]
    fn past_date_is_a_field_error_and_stops() {
        let now = at((2030, 1, 10), (10, 0));
        let errors = validate_slot(d(2030, 1, 9), t(7, 0), now, &ClinicConfig::default());
        assert!(errors.has_field("date"));
        assert!(!errors.has_field("time"));
        assert!(errors.non_field.is_empty());
    }

    #[test]
    fn earlier_today_is_a_form_error() {
        let now = at((2030, 1, 10), (15, 0));
        let errors = validate_slot(d(2030, 1, 10), t(10, 0), now, &ClinicConfig::default());
        assert_eq!(errors.non_field, vec![DATETIME_IN_PAST.to_string()]);
        assert!(errors.fields.is_empty());
    }

    #[test]
    fn slot_message_uses_day_first_dates() {
        assert_eq!(
            slot_taken_message(d(2030, 3, 7), t(9, 30)),
            "An appointment is already booked for 07/03/2030 at 09:30. Please choose another date or time."
        );
    }

    #[test]
    fn day_slots_cover_opening_to_closing() {
        let slots = day_slots(&ClinicConfig::default());
        assert_eq!(slots.first(), Some(&t(9, 0)));
        assert_eq!(slots.last(), Some(&t(18, 0)));
        assert_eq!(slots.len(), 19);
    }

    #[test]
    fn clock_time_accepts_short_and_long_forms() {
        assert_eq!(clock_time::parse("09:30"), Some(t(9, 30)));
        assert_eq!(clock_time::parse("09:30:00"), Some(t(9, 30)));
        assert_eq!(clock_time::parse("9h30"), None);
    }

    #[test]
    fn database_refusals_become_form_errors() {
        let date = d(2030, 3, 7);
        let time = t(9, 30);
        match slot_error(DbErr::Custom(SLOT_TAKEN.into()), date, time) {
            ServiceError::FormErrors(errors) => {
                assert_eq!(errors.non_field, vec![slot_taken_message(date, time)])
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            slot_error(DbErr::Custom("boom".into()), date, time),
            ServiceError::DatabaseError(_)
        ));
    }
}
