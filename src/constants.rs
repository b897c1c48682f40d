pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32000;

pub const MIN_USERNAME: usize = 3;
pub const MAX_USERNAME: usize = 24;

pub const NAME_LENGTH: usize = 150;
pub const EMAIL_LENGTH: usize = 254;
pub const COLOR_LENGTH: usize = 7;
pub const UNIT_LENGTH: usize = 24;
pub const TEXT_LENGTH: usize = 3000;

pub const DEFAULT_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_cart.txt";
pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";

/// (name, color, slug)
pub const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("Breakfast", "#E26C2D", "breakfast"),
    ("Lunch", "#88E990", "lunch"),
    ("Dinner", "#494CE8", "dinner"),
];
