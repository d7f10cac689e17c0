/// Types implementing BeanstalkSerialisable can be sent over the Beanstalk TCP
/// connection in the client -> server direction.
pub trait BeanstalkSerialisable {
    /// Converts the value in question to its exact bytes on the wire,
    /// including every trailing CRLF.
    fn serialise_beanstalk(&self) -> Vec<u8>;
}
