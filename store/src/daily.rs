//! Date rollover for [`DailyState`].

use chrono::NaiveDate;

use crate::model::DailyState;

/// Returns the state that is valid for `today`, plus whether a reset happened.
///
/// A missing record, or one stamped with any other date, is replaced by a
/// zeroed record for `today`. The caller persists the result when the flag is
/// set.
pub fn get_or_reset_daily_state(stored: Option<DailyState>, today: NaiveDate) -> (DailyState, bool) {
    match stored {
        Some(state) if state.date == today => (state, false),
        _ => (DailyState::fresh(today), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn missing_record_is_created() {
        let (state, reset) = get_or_reset_daily_state(None, day(14));
        assert!(reset);
        assert_eq!(state, DailyState::fresh(day(14)));
    }

    #[test]
    fn same_day_record_is_kept() {
        let mut stored = DailyState::fresh(day(14));
        stored.record(Some("09:00"));

        let (state, reset) = get_or_reset_daily_state(Some(stored.clone()), day(14));
        assert!(!reset);
        assert_eq!(state, stored);
    }

    #[test]
    fn record_from_the_future_is_also_discarded() {
        let mut stored = DailyState::fresh(day(15));
        stored.record(None);

        let (state, reset) = get_or_reset_daily_state(Some(stored), day(14));
        assert!(reset);
        assert_eq!(state.count, 0);
    }

    proptest! {
        #[test]
        fn stale_records_always_roll_over(
            stored_day in 1u32..=31,
            today in 1u32..=31,
            count in 0u32..100,
            slots in proptest::collection::btree_set("[0-2][0-9]:[0-5][0-9]", 0..6),
        ) {
            prop_assume!(stored_day != today);

            let stored = DailyState { date: day(stored_day), count, fired_slots: slots };
            let (state, reset) = get_or_reset_daily_state(Some(stored), day(today));

            prop_assert!(reset);
            prop_assert_eq!(state.count, 0);
            prop_assert!(state.fired_slots.is_empty());

            // A second read on the same day is stable.
            let (again, reset_again) = get_or_reset_daily_state(Some(state.clone()), day(today));
            prop_assert!(!reset_again);
            prop_assert_eq!(again, state);
        }
    }
}
