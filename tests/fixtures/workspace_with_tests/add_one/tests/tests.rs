mod fibonacci_test {
    #[test]
    fn case_1() {
        assert_eq!(add_one::add_one(0), 1);
    }

    #[test]
    fn case_2() {
        assert_eq!(add_one::add_one(1), 2);
    }
}
