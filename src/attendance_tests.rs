// src/attendance_tests.rs

#[cfg(test)]
mod tests {
    use crate::attendance::*;
    use crate::schedule::ScheduleEntry;
    use crate::timesheet::PunchRecord;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
    use std::collections::{HashMap, HashSet};

    // 2025-06-02 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn entry(name: &str, monday_text: &str) -> ScheduleEntry {
        let mut days = HashMap::new();
        days.insert(Weekday::Mon, monday_text.to_string());
        days.insert(Weekday::Tue, "8am-4pm".to_string());
        ScheduleEntry::new(name, days)
    }

    fn punch(name: &str, at: &str) -> PunchRecord {
        let ts = NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M").unwrap();
        PunchRecord::new(name, Some(ts))
    }

    fn find<'a>(rows: &'a [AttendanceRow], name: &str) -> &'a AttendanceRow {
        rows.iter()
            .find(|r| r.display_name == name)
            .unwrap_or_else(|| panic!("no row for {}", name))
    }

    #[test]
    fn test_scenario_late_clock_in() {
        let rows = classify(
            &[entry("Alice", "9am-5pm")],
            &[punch("Alice", "2025-06-02 09:05")],
            monday(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::LateClockIn);
        assert_eq!(rows[0].clock_in_display, "09:05 AM");
        assert_eq!(rows[0].scheduled_text, "9am-5pm");
        assert_eq!(rows[0].date, monday());
    }

    #[test]
    fn test_scenario_present() {
        let rows = classify(
            &[entry("Bob", "9am-5pm")],
            &[punch("Bob", "2025-06-02 08:55")],
            monday(),
        );
        assert_eq!(rows[0].status, AttendanceStatus::Present);
        assert_eq!(rows[0].clock_in_display, "08:55 AM");
    }

    #[test]
    fn test_clock_in_exactly_at_start_is_present() {
        let rows = classify(
            &[entry("Bob", "9am-5pm")],
            &[punch("Bob", "2025-06-02 09:00")],
            monday(),
        );
        assert_eq!(rows[0].status, AttendanceStatus::Present);
    }

    #[test]
    fn test_scenario_not_scheduled() {
        let rows = classify(&[entry("Carol", "off")], &[], monday());
        assert_eq!(rows[0].status, AttendanceStatus::NotScheduled);
        assert_eq!(rows[0].clock_in_display, "");
        assert_eq!(rows[0].scheduled_text, "off");
    }

    #[test]
    fn test_day_off_with_punch_is_still_not_scheduled() {
        let rows = classify(
            &[entry("Carol", "OFF")],
            &[punch("Carol", "2025-06-02 10:00")],
            monday(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::NotScheduled);
        assert_eq!(rows[0].clock_in_display, "");
    }

    #[test]
    fn test_scenario_absent() {
        let rows = classify(
            &[entry("Dave", "9am-5pm")],
            &[punch("Dave", "2025-06-03 08:00")],
            monday(),
        );
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
        assert_eq!(rows[0].clock_in_display, "");
    }

    #[test]
    fn test_scenario_present_no_schedule() {
        let rows = classify(
            &[entry("Alice", "9am-5pm")],
            &[
                punch("Alice", "2025-06-02 08:30"),
                punch("eve smith", "2025-06-02 07:45"),
            ],
            monday(),
        );
        let eve = find(&rows, "Eve Smith");
        assert_eq!(eve.status, AttendanceStatus::PresentNoSchedule);
        assert_eq!(eve.scheduled_text, "");
        assert_eq!(eve.clock_in_display, "07:45 AM");
    }

    #[test]
    fn test_unparseable_start_with_punch_is_present() {
        let rows = classify(
            &[entry("Frank", "late shift")],
            &[punch("Frank", "2025-06-02 23:00")],
            monday(),
        );
        assert_eq!(rows[0].status, AttendanceStatus::Present);
        assert_eq!(rows[0].clock_in_display, "11:00 PM");
    }

    #[test]
    fn test_spaced_meridiem_start_is_not_a_lateness_bound() {
        let rows = classify(
            &[entry("Gina", "10 am-6pm"), entry("Hank", "9:30 a.m.-5pm")],
            &[
                punch("Gina", "2025-06-02 10:30"),
                punch("Hank", "2025-06-02 09:45"),
            ],
            monday(),
        );
        assert_eq!(find(&rows, "Gina").status, AttendanceStatus::Present);
        assert_eq!(find(&rows, "Hank").status, AttendanceStatus::Present);
        assert_eq!(find(&rows, "Gina").clock_in_display, "10:30 AM");
    }

    #[test]
    fn test_unparseable_start_without_punch_is_absent() {
        let rows = classify(&[entry("Frank", "late shift")], &[], monday());
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
    }

    #[test]
    fn test_earliest_punch_wins() {
        let rows = classify(
            &[entry("Alice", "9am-5pm")],
            &[
                punch("Alice", "2025-06-02 13:00"),
                punch("ALICE (temp)", "2025-06-02 08:50"),
                punch("Alice", "2025-06-02 09:30"),
            ],
            monday(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Present);
        assert_eq!(rows[0].clock_in_display, "08:50 AM");
    }

    #[test]
    fn test_punch_only_name_comes_from_first_punch() {
        let rows = classify(
            &[],
            &[
                punch("eve  SMITH", "2025-06-02 10:00"),
                punch("Eve Smith (Temp)", "2025-06-02 07:00"),
            ],
            monday(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "Eve Smith");
        assert_eq!(rows[0].clock_in_display, "07:00 AM");
    }

    #[test]
    fn test_names_join_across_sources_after_normalization() {
        let rows = classify(
            &[entry("Jane Doe (Contractor)", "9:30am-5pm")],
            &[punch("  jane   doe ", "2025-06-02 09:45")],
            monday(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "Jane Doe (Contractor)");
        assert_eq!(rows[0].status, AttendanceStatus::LateClockIn);
    }

    #[test]
    fn test_duplicate_schedule_rows_keep_first() {
        let rows = classify(
            &[entry("John Smith", "off"), entry("john smith", "9am-5pm")],
            &[punch("John Smith", "2025-06-02 09:10")],
            monday(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::NotScheduled);
    }

    #[test]
    fn test_untimed_and_nameless_punches_are_ignored() {
        let rows = classify(
            &[entry("Dave", "9am-5pm")],
            &[PunchRecord::new("Dave", None), punch("   ", "2025-06-02 09:00")],
            monday(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
    }

    #[test]
    fn test_weekday_selects_schedule_column() {
        let tuesday = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let rows = classify(
            &[entry("Alice", "off")],
            &[punch("Alice", "2025-06-03 08:01")],
            tuesday,
        );
        assert_eq!(rows[0].status, AttendanceStatus::LateClockIn);
        assert_eq!(rows[0].scheduled_text, "8am-4pm");
    }

    fn mixed_fixture() -> (Vec<ScheduleEntry>, Vec<PunchRecord>) {
        let schedule = vec![
            entry("alice", "9am-5pm"),
            entry("Bob", "9am-5pm"),
            entry("Carol", "off"),
            entry("Dave", "9am-5pm"),
            entry("frank", "10am-6pm"),
            entry("Grace", ""),
            entry("Heidi", "7:30am-3pm"),
        ];
        let punches = vec![
            punch("Alice", "2025-06-02 09:05"),
            punch("Bob", "2025-06-02 08:55"),
            punch("Eve Smith", "2025-06-02 08:00"),
            punch("Heidi", "2025-06-02 07:15"),
            punch("Zed", "2025-06-02 12:00"),
            PunchRecord::new("Ivan", None),
        ];
        (schedule, punches)
    }

    #[test]
    fn test_mixed_fixture_ordering() {
        let (schedule, punches) = mixed_fixture();
        let rows = classify(&schedule, &punches, monday());

        let got: Vec<(&str, AttendanceStatus)> = rows
            .iter()
            .map(|r| (r.display_name.as_str(), r.status))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Dave", AttendanceStatus::Absent),
                ("Frank", AttendanceStatus::Absent),
                ("Alice", AttendanceStatus::LateClockIn),
                ("Carol", AttendanceStatus::NotScheduled),
                ("Grace", AttendanceStatus::NotScheduled),
                ("Bob", AttendanceStatus::Present),
                ("Heidi", AttendanceStatus::Present),
                ("Eve Smith", AttendanceStatus::PresentNoSchedule),
                ("Zed", AttendanceStatus::PresentNoSchedule),
            ]
        );
    }

    #[test]
    fn test_every_person_appears_exactly_once() {
        let (schedule, punches) = mixed_fixture();
        let rows = classify(&schedule, &punches, monday());

        let mut expected: HashSet<String> =
            schedule.iter().map(|e| e.normalized_name.clone()).collect();
        expected.extend(
            punches
                .iter()
                .filter(|p| p.calendar_date == Some(monday()))
                .map(|p| p.normalized_name.clone()),
        );
        let produced: Vec<String> = rows
            .iter()
            .map(|r| crate::name_key::normalize(&r.display_name))
            .collect();
        let unique: HashSet<String> = produced.iter().cloned().collect();

        assert_eq!(produced.len(), unique.len(), "duplicate rows produced");
        assert_eq!(unique, expected);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let (schedule, punches) = mixed_fixture();
        let first = classify(&schedule, &punches, monday());
        let second = classify(&schedule, &punches, monday());
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_late_null_start_never_late() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(!is_late(ten, None));
        assert!(is_late(ten, Some(nine)));
        assert!(!is_late(nine, Some(nine)));
    }

    #[test]
    fn test_group_punches_counts_only_target_date() {
        let punches = vec![
            punch("Alice", "2025-06-02 09:05"),
            punch("alice", "2025-06-02 12:00"),
            punch("Alice", "2025-06-01 09:00"),
        ];
        let groups = group_punches(&punches, monday());
        let alice = groups.get("alice").unwrap();
        assert_eq!(alice.punch_count, 2);
        assert_eq!(alice.first_clock_in.format("%H:%M").to_string(), "09:05");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(AttendanceStatus::LateClockIn.to_string(), "Late Clock-in");
        assert_eq!(
            AttendanceStatus::PresentNoSchedule.label(),
            "Present (No Schedule)"
        );
    }
}
