mod tests1 {
    #[test]
    fn it_works1() {
        assert_eq!(adder::add(1, 2), 3);
    }

    #[test]
    #[ignore]
    fn it_works_skipped2() {
        assert_eq!(adder::add(2, 3), 5);
    }
}
