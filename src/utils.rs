// vortexstore - data-as-video encoder/decoder.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! General utility functions.

use chrono::Duration;
use std::time;

/// Format a duration to human readable form.
pub fn format_duration(duration: time::Duration) -> String {
    let Ok(chrono_duration) = Duration::from_std(duration) else {
        return "Duration too large".to_string();
    };

    if chrono_duration < Duration::milliseconds(1) {
        // Microseconds (µs)
        format!("{} µs", chrono_duration.num_microseconds().unwrap_or(0))
    } else if chrono_duration < Duration::seconds(1) {
        // Milliseconds (ms)
        format!("{} ms", chrono_duration.num_milliseconds())
    } else if chrono_duration < Duration::minutes(1) {
        // Seconds (s)
        format!("{} s", chrono_duration.num_seconds())
    } else {
        // Hours:Minutes:Seconds (hh:mm:ss)
        format!(
            "{:02}:{:02}:{:02}",
            chrono_duration.num_hours(),
            chrono_duration.num_minutes() % 60,
            chrono_duration.num_seconds() % 60
        )
    }
}
