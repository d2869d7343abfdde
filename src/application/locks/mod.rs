pub mod std;
