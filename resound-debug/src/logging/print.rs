use crate::logging::stack::{get_message_count, increment_message_count, message_offset, stack_size};
use crate::logging::symbols::{ARROW, NEWLINE};

/// Prints a message to the debug log, indented below the currently running
/// [`Timer`](crate::logging::Timer)s.
#[macro_export]
macro_rules! print_debug {
    ($format:expr) => ($crate::logging::print_indented(String::from($format), true));
    ($format:expr, $($arguments:tt)*) => ($crate::logging::print_indented(format!($format, $($arguments)*), true));
}

macro_rules! print_debug_prefix {
    ($format:expr) => ($crate::logging::print_indented(String::from($format), false));
    ($format:expr, $($arguments:tt)*) => ($crate::logging::print_indented(format!($format, $($arguments)*), false));
}

pub(crate) use print_debug_prefix;

pub fn print_indented(message: String, newline: bool) {
    let offset = message_offset();

    if stack_size() > 0 {
        if get_message_count() == 0 {
            println!(" {ARROW} started");
        }

        increment_message_count();
    }

    for _ in 0..offset {
        print!(" ");
    }

    if offset != 0 {
        print!("{NEWLINE} ");
    }

    print!("{message}");

    if newline {
        println!();
    }
}
