fn main() {
    jiratime_lib::run()
}
