use std::cell::RefCell;

struct StackItem {
    pub message_count: usize,
    pub size: usize,
}

impl StackItem {
    pub fn new(message_count: usize, size: usize) -> Self {
        Self { message_count, size }
    }
}

thread_local! {
    static STACK: RefCell<Vec<StackItem>> = const { RefCell::new(Vec::new()) };
}

pub fn stack_size() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

pub fn message_offset() -> usize {
    STACK.with(|stack| stack.borrow().iter().map(|item| item.size).sum())
}

pub fn increment_stack(size: usize) {
    STACK.with(|stack| stack.borrow_mut().push(StackItem::new(0, size)))
}

pub fn decrement_stack() {
    STACK.with(|stack| {
        stack.borrow_mut().pop();
    })
}

pub fn increment_message_count() {
    STACK.with(|stack| {
        if let Some(item) = stack.borrow_mut().last_mut() {
            item.message_count += 1;
        }
    })
}

pub fn get_message_count() -> usize {
    STACK.with(|stack| stack.borrow().last().map(|item| item.message_count).unwrap_or(0))
}
