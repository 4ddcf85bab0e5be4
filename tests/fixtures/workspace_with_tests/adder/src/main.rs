fn main() {
    println!("{}", adder::add_two(40));
}
