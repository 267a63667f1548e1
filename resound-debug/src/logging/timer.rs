use std::time::SystemTime;

use super::colors::Colorize;
use super::print::print_debug_prefix;
use super::stack::{decrement_stack, get_message_count, increment_stack, stack_size};
use super::symbols::ARROW;
use crate::print_debug;

/// Times a unit of work and prints its completion state to the debug log.
pub struct Timer {
    start_time: SystemTime,
    completed: bool,
    name: String,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self::new_dynamic(String::from(name))
    }

    pub fn new_dynamic(name: String) -> Self {
        if stack_size() == 0 {
            let timestamp = chrono::offset::Local::now().time().format("%H:%M:%S").to_string();
            print_debug_prefix!("[{}] {}", timestamp.red(), name);
        } else {
            print_debug_prefix!("{}", name);
        }

        increment_stack(2);

        let start_time = SystemTime::now();
        let completed = false;

        Self {
            start_time,
            completed,
            name,
        }
    }

    fn elapsed_milliseconds(&self) -> u128 {
        self.start_time.elapsed().map(|elapsed| elapsed.as_millis()).unwrap_or(0)
    }

    fn finish(&mut self, state: &str, failed: bool) {
        if stack_size() > 0 && get_message_count() == 0 {
            decrement_stack();
            println!(" ({})", format!("{}ms", self.elapsed_milliseconds()).cyan());
        } else {
            decrement_stack();
            let state = match failed {
                true => format!("{}", state.red()),
                false => format!("{}", state.green()),
            };
            print_debug!(
                "{} {} {} ({})",
                self.name,
                ARROW,
                state,
                format!("{}ms", self.elapsed_milliseconds()).cyan(),
            );
        }

        if stack_size() == 0 {
            println!();
        }

        self.completed = true;
    }

    pub fn stop(mut self) {
        self.finish("completed", false);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.completed {
            self.finish("failed", true);
        }
    }
}
