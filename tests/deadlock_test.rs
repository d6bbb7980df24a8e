// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests drive the marketplace from many threads at once, mixing
//! purchases, administrative removals and read queries, and verify that the
//! course locks and registry shards never form a cycle.
//!
//! The `deadlock_detection` feature of parking_lot is enabled for tests, so the
//! course mutexes participate in the lock graph.

use course_market::{CourseId, MarketConfig, MarketError, Marketplace, NewUser, UserId};
use parking_lot::deadlock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

// === Fixtures ===

fn market_with(students: u32, courses: u32, capacity: usize) -> (Arc<Marketplace>, UserId, Vec<UserId>, Vec<CourseId>) {
    let market = Arc::new(
        Marketplace::with_config(MarketConfig {
            course_capacity: capacity,
            starting_bonuses: 1_000_000,
            ..MarketConfig::default()
        })
        .unwrap(),
    );
    let admin = market
        .register(NewUser::staff("admin@example.com"))
        .unwrap()
        .id();
    let students = (0..students)
        .map(|n| {
            market
                .register(NewUser::student(format!("s{n}@example.com")))
                .unwrap()
                .id()
        })
        .collect();
    let courses = (0..courses)
        .map(|n| market.create_course(admin, format!("C{n}"), 1).unwrap().id())
        .collect();
    (market, admin, students, courses)
}

fn assert_consistent(market: &Marketplace, course: CourseId) {
    let course = market.course(course).unwrap();
    let enrolled = course.students_count();
    let grouped: usize = course.groups().iter().map(|g| g.students.len()).sum();
    assert_eq!(grouped, enrolled);
    assert_eq!(course.is_available(), enrolled < course.capacity());
}

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// Many buyers and readers contending on a single course.
#[test]
fn no_deadlock_high_contention_single_course() {
    let detector = start_deadlock_detector();
    let (market, _admin, students, courses) = market_with(400, 1, 300);
    let course = courses[0];

    const NUM_THREADS: usize = 40;

    let mut handles = Vec::with_capacity(NUM_THREADS);
    for (thread_id, chunk) in students.chunks(students.len() / NUM_THREADS).enumerate() {
        let market = market.clone();
        let chunk = chunk.to_vec();

        let handle = thread::spawn(move || {
            for student in chunk {
                // Buyers past capacity find the course closed.
                match market.purchase(student, course) {
                    Ok(_) | Err(MarketError::CourseClosed) => {}
                    Err(e) => panic!("purchase failed: {e}"),
                }

                // Read operations
                if thread_id % 2 == 0 {
                    let _ = market.available_courses();
                    let _ = market.groups(course);
                } else {
                    let _ = market.enrollments_of(student);
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let course = market.course(course).unwrap();
    assert_eq!(course.students_count(), 300);
    assert!(!course.is_available());
    assert_consistent(&market, course.id());
}

/// Buyers spread over several courses while staff remove and clear members.
#[test]
fn no_deadlock_purchases_with_concurrent_removals() {
    let detector = start_deadlock_detector();
    let (market, admin, students, courses) = market_with(60, 5, 20);

    const NUM_BUYERS: usize = 12;
    const ROUNDS: usize = 20;

    let mut handles = Vec::with_capacity(NUM_BUYERS + 2);

    for thread_id in 0..NUM_BUYERS {
        let market = market.clone();
        let students = students.clone();
        let courses = courses.clone();

        handles.push(thread::spawn(move || {
            for round in 0..ROUNDS {
                let student = students[(thread_id * 5 + round) % students.len()];
                let course = courses[(thread_id + round) % courses.len()];
                // AlreadyEnrolled is expected when rounds overlap.
                let _ = market.purchase(student, course);
            }
        }));
    }

    // Removers
    {
        let market = market.clone();
        let students = students.clone();
        let courses = courses.clone();
        handles.push(thread::spawn(move || {
            for round in 0..ROUNDS * 3 {
                let student = students[round % students.len()];
                let course = courses[round % courses.len()];
                let _ = market.remove_student(admin, course, student);
            }
        }));
    }
    {
        let market = market.clone();
        let courses = courses.clone();
        handles.push(thread::spawn(move || {
            for round in 0..ROUNDS {
                let _ = market.clear_students(admin, courses[round % courses.len()]);
                thread::sleep(Duration::from_micros(200));
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    for course in &courses {
        assert_consistent(&market, *course);
        let course = market.course(*course).unwrap();
        for student in course.students() {
            assert!(market.enrollment(student, course.id()).is_some());
        }
    }
}

/// One student buying every course at once from many threads.
#[test]
fn no_deadlock_same_student_many_courses() {
    let detector = start_deadlock_detector();
    let (market, _admin, students, courses) = market_with(1, 30, 300);
    let student = students[0];

    let handles: Vec<_> = courses
        .iter()
        .map(|&course| {
            let market = market.clone();
            thread::spawn(move || {
                market.purchase(student, course).expect("purchase failed");
                let _ = market.enrollments_of(student);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let user = market.user(student).unwrap();
    assert_eq!(user.balance().bonuses(), 1_000_000 - 30);
    assert_eq!(market.enrollments_of(student).unwrap().len(), 30);
}
