pub fn add(left: i32, right: i32) -> i32 {
    left + right
}

pub fn add_two(x: i32) -> i32 {
    add_one::add_one(add_one::add_one(x))
}
