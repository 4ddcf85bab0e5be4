#[test]
fn it_adds_two() {
    assert_eq!(adder::add_two(2), 4);
}

#[test]
fn it_works_failing() {
    assert_eq!(adder::add(2, 2), 5);
}

#[test]
#[ignore]
fn slow() {
    assert_eq!(adder::add(1, 1), 2);
}
