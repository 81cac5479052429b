//! Decoding of delivery stream descriptions into [`Record`]s.
//!
//! The SDK returns strongly typed shapes. The materializer walks records by dotted path, so a
//! description is decoded once into a `serde_json::Value` tree keyed by the AWS wire field names
//! (`DeliveryStreamARN`, `Destinations`, `ExtendedS3DestinationDescription`, ...). Absent
//! members are left out of the tree, timestamps become RFC 3339 strings and enums their wire
//! strings.

use aws_sdk_firehose::{
    primitives::{DateTime, DateTimeFormat},
    types::*,
};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// A nested detail record: maps, sequences and scalars.
pub type Record = Value;

/// Decode a delivery stream description into its record tree.
pub fn decode(description: &DeliveryStreamDescription) -> Record {
    description.to_value()
}

trait ToValue {
    fn to_value(&self) -> Value;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map(ToValue::to_value).unwrap_or(Value::Null)
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl ToValue for HashMap<String, String> {
    fn to_value(&self) -> Value {
        let map = self
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>();
        Value::Object(map)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for i32 {
    fn to_value(&self) -> Value {
        Value::Number((*self).into())
    }
}

impl ToValue for i64 {
    fn to_value(&self) -> Value {
        Value::Number((*self).into())
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Number::from_f64(*self)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl ToValue for DateTime {
    fn to_value(&self) -> Value {
        self.fmt(DateTimeFormat::DateTime)
            .map(Value::String)
            .unwrap_or(Value::Null)
    }
}

macro_rules! enum_to_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::String(self.as_str().to_string())
                }
            }
        )*
    };
}

enum_to_value!(
    AmazonopensearchserviceIndexRotationPeriod,
    AmazonopensearchserviceS3BackupMode,
    CompressionFormat,
    DeliveryStreamEncryptionStatus,
    DeliveryStreamFailureType,
    DeliveryStreamStatus,
    DeliveryStreamType,
    KeyType,
    NoEncryptionConfig,
    OrcCompression,
    OrcFormatVersion,
    ParquetCompression,
    ParquetWriterVersion,
    ProcessorParameterName,
    ProcessorType,
    S3BackupMode,
);

/// Object under construction. Null members are skipped so that they resolve as absent.
#[derive(Default)]
struct Object(Map<String, Value>);

impl Object {
    fn field(mut self, key: &str, value: impl ToValue) -> Self {
        let value = value.to_value();
        if !value.is_null() {
            self.0.insert(key.to_string(), value);
        }
        self
    }

    fn build(self) -> Value {
        Value::Object(self.0)
    }
}

impl ToValue for DeliveryStreamDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("DeliveryStreamName", self.delivery_stream_name())
            .field("DeliveryStreamARN", self.delivery_stream_arn())
            .field("DeliveryStreamStatus", self.delivery_stream_status())
            .field("DeliveryStreamType", self.delivery_stream_type())
            .field("VersionId", self.version_id())
            .field("CreateTimestamp", self.create_timestamp())
            .field("LastUpdateTimestamp", self.last_update_timestamp())
            .field("FailureDescription", self.failure_description())
            .field(
                "DeliveryStreamEncryptionConfiguration",
                self.delivery_stream_encryption_configuration(),
            )
            .field("Source", self.source())
            .field("Destinations", self.destinations())
            .field("HasMoreDestinations", self.has_more_destinations())
            .build()
    }
}

impl ToValue for FailureDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Type", self.r#type())
            .field("Details", self.details())
            .build()
    }
}

impl ToValue for DeliveryStreamEncryptionConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("KeyARN", self.key_arn())
            .field("KeyType", self.key_type())
            .field("Status", self.status())
            .field("FailureDescription", self.failure_description())
            .build()
    }
}

impl ToValue for SourceDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field(
                "KinesisStreamSourceDescription",
                self.kinesis_stream_source_description(),
            )
            .build()
    }
}

impl ToValue for KinesisStreamSourceDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("KinesisStreamARN", self.kinesis_stream_arn())
            .field("RoleARN", self.role_arn())
            .field("DeliveryStartTimestamp", self.delivery_start_timestamp())
            .build()
    }
}

impl ToValue for DestinationDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("DestinationId", self.destination_id())
            .field("S3DestinationDescription", self.s3_destination_description())
            .field(
                "ExtendedS3DestinationDescription",
                self.extended_s3_destination_description(),
            )
            .field(
                "AmazonopensearchserviceDestinationDescription",
                self.amazonopensearchservice_destination_description(),
            )
            .build()
    }
}

impl ToValue for BufferingHints {
    fn to_value(&self) -> Value {
        Object::default()
            .field("SizeInMBs", self.size_in_mbs())
            .field("IntervalInSeconds", self.interval_in_seconds())
            .build()
    }
}

impl ToValue for EncryptionConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("NoEncryptionConfig", self.no_encryption_config())
            .field("KMSEncryptionConfig", self.kms_encryption_config())
            .build()
    }
}

impl ToValue for KmsEncryptionConfig {
    fn to_value(&self) -> Value {
        Object::default()
            .field("AWSKMSKeyARN", self.awskms_key_arn())
            .build()
    }
}

impl ToValue for CloudWatchLoggingOptions {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Enabled", self.enabled())
            .field("LogGroupName", self.log_group_name())
            .field("LogStreamName", self.log_stream_name())
            .build()
    }
}

impl ToValue for ProcessingConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Enabled", self.enabled())
            .field("Processors", self.processors())
            .build()
    }
}

impl ToValue for Processor {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Type", self.r#type())
            .field("Parameters", self.parameters())
            .build()
    }
}

impl ToValue for ProcessorParameter {
    fn to_value(&self) -> Value {
        Object::default()
            .field("ParameterName", self.parameter_name())
            .field("ParameterValue", self.parameter_value())
            .build()
    }
}

impl ToValue for S3DestinationDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("RoleARN", self.role_arn())
            .field("BucketARN", self.bucket_arn())
            .field("Prefix", self.prefix())
            .field("ErrorOutputPrefix", self.error_output_prefix())
            .field("BufferingHints", self.buffering_hints())
            .field("CompressionFormat", self.compression_format())
            .field("EncryptionConfiguration", self.encryption_configuration())
            .field("CloudWatchLoggingOptions", self.cloud_watch_logging_options())
            .build()
    }
}

impl ToValue for ExtendedS3DestinationDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("RoleARN", self.role_arn())
            .field("BucketARN", self.bucket_arn())
            .field("Prefix", self.prefix())
            .field("ErrorOutputPrefix", self.error_output_prefix())
            .field("BufferingHints", self.buffering_hints())
            .field("CompressionFormat", self.compression_format())
            .field("EncryptionConfiguration", self.encryption_configuration())
            .field("CloudWatchLoggingOptions", self.cloud_watch_logging_options())
            .field("ProcessingConfiguration", self.processing_configuration())
            .field("S3BackupMode", self.s3_backup_mode())
            .field("S3BackupDescription", self.s3_backup_description())
            .field(
                "DataFormatConversionConfiguration",
                self.data_format_conversion_configuration(),
            )
            .field(
                "DynamicPartitioningConfiguration",
                self.dynamic_partitioning_configuration(),
            )
            .build()
    }
}

impl ToValue for DataFormatConversionConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Enabled", self.enabled())
            .field("SchemaConfiguration", self.schema_configuration())
            .field("InputFormatConfiguration", self.input_format_configuration())
            .field("OutputFormatConfiguration", self.output_format_configuration())
            .build()
    }
}

impl ToValue for SchemaConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("CatalogId", self.catalog_id())
            .field("DatabaseName", self.database_name())
            .field("Region", self.region())
            .field("RoleARN", self.role_arn())
            .field("TableName", self.table_name())
            .field("VersionId", self.version_id())
            .build()
    }
}

impl ToValue for InputFormatConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Deserializer", self.deserializer())
            .build()
    }
}

impl ToValue for Deserializer {
    fn to_value(&self) -> Value {
        Object::default()
            .field("OpenXJsonSerDe", self.open_x_json_ser_de())
            .field("HiveJsonSerDe", self.hive_json_ser_de())
            .build()
    }
}

impl ToValue for OpenXJsonSerDe {
    fn to_value(&self) -> Value {
        Object::default()
            .field(
                "ConvertDotsInJsonKeysToUnderscores",
                self.convert_dots_in_json_keys_to_underscores(),
            )
            .field("CaseInsensitive", self.case_insensitive())
            .field("ColumnToJsonKeyMappings", self.column_to_json_key_mappings())
            .build()
    }
}

impl ToValue for HiveJsonSerDe {
    fn to_value(&self) -> Value {
        Object::default()
            .field("TimestampFormats", self.timestamp_formats())
            .build()
    }
}

impl ToValue for OutputFormatConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Serializer", self.serializer())
            .build()
    }
}

impl ToValue for Serializer {
    fn to_value(&self) -> Value {
        Object::default()
            .field("ParquetSerDe", self.parquet_ser_de())
            .field("OrcSerDe", self.orc_ser_de())
            .build()
    }
}

impl ToValue for ParquetSerDe {
    fn to_value(&self) -> Value {
        Object::default()
            .field("BlockSizeBytes", self.block_size_bytes())
            .field("PageSizeBytes", self.page_size_bytes())
            .field("Compression", self.compression())
            .field(
                "EnableDictionaryCompression",
                self.enable_dictionary_compression(),
            )
            .field("MaxPaddingBytes", self.max_padding_bytes())
            .field("WriterVersion", self.writer_version())
            .build()
    }
}

impl ToValue for OrcSerDe {
    fn to_value(&self) -> Value {
        Object::default()
            .field("StripeSizeBytes", self.stripe_size_bytes())
            .field("BlockSizeBytes", self.block_size_bytes())
            .field("RowIndexStride", self.row_index_stride())
            .field("EnablePadding", self.enable_padding())
            .field("PaddingTolerance", self.padding_tolerance())
            .field("Compression", self.compression())
            .field("BloomFilterColumns", self.bloom_filter_columns())
            .field(
                "BloomFilterFalsePositiveProbability",
                self.bloom_filter_false_positive_probability(),
            )
            .field("DictionaryKeyThreshold", self.dictionary_key_threshold())
            .field("FormatVersion", self.format_version())
            .build()
    }
}

impl ToValue for DynamicPartitioningConfiguration {
    fn to_value(&self) -> Value {
        Object::default()
            .field("Enabled", self.enabled())
            .field("RetryOptions", self.retry_options())
            .build()
    }
}

impl ToValue for RetryOptions {
    fn to_value(&self) -> Value {
        Object::default()
            .field("DurationInSeconds", self.duration_in_seconds())
            .build()
    }
}

impl ToValue for AmazonopensearchserviceDestinationDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("RoleARN", self.role_arn())
            .field("DomainARN", self.domain_arn())
            .field("ClusterEndpoint", self.cluster_endpoint())
            .field("IndexName", self.index_name())
            .field("TypeName", self.type_name())
            .field("IndexRotationPeriod", self.index_rotation_period())
            .field("BufferingHints", self.buffering_hints())
            .field("RetryOptions", self.retry_options())
            .field("S3BackupMode", self.s3_backup_mode())
            .field("S3DestinationDescription", self.s3_destination_description())
            .field("ProcessingConfiguration", self.processing_configuration())
            .field("CloudWatchLoggingOptions", self.cloud_watch_logging_options())
            .field(
                "VpcConfigurationDescription",
                self.vpc_configuration_description(),
            )
            .build()
    }
}

impl ToValue for AmazonopensearchserviceBufferingHints {
    fn to_value(&self) -> Value {
        Object::default()
            .field("IntervalInSeconds", self.interval_in_seconds())
            .field("SizeInMBs", self.size_in_mbs())
            .build()
    }
}

impl ToValue for AmazonopensearchserviceRetryOptions {
    fn to_value(&self) -> Value {
        Object::default()
            .field("DurationInSeconds", self.duration_in_seconds())
            .build()
    }
}

impl ToValue for VpcConfigurationDescription {
    fn to_value(&self) -> Value {
        Object::default()
            .field("SubnetIds", self.subnet_ids())
            .field("RoleARN", self.role_arn())
            .field("SecurityGroupIds", self.security_group_ids())
            .field("VpcId", self.vpc_id())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        materialize::{Context, Materializer},
        row::Datum,
        schema::firehose,
    };
    use aws_smithy_types::error::operation::BuildError;
    use serde_json::json;

    #[test]
    fn absent_members_are_left_out() {
        let hints = BufferingHints::builder().size_in_mbs(5).build();
        assert_eq!(hints.to_value(), json!({ "SizeInMBs": 5 }));
    }

    #[test]
    fn nested_members_use_wire_names() {
        let options = CloudWatchLoggingOptions::builder()
            .enabled(true)
            .log_group_name("/aws/firehose")
            .build();
        let config = ProcessingConfiguration::builder().enabled(false).build();

        assert_eq!(
            options.to_value(),
            json!({ "Enabled": true, "LogGroupName": "/aws/firehose" })
        );
        assert_eq!(config.to_value()["Enabled"], json!(false));
    }

    #[test]
    fn timestamps_are_rfc3339_strings() {
        let value = DateTime::from_secs(0).to_value();
        assert_eq!(value, json!("1970-01-01T00:00:00Z"));
    }

    /// Unwraps builders whether or not they validate required members.
    trait Built<T> {
        fn built(self) -> T;
    }

    macro_rules! built {
        ($($ty:ty),* $(,)?) => {
            $(
                impl Built<$ty> for $ty {
                    fn built(self) -> $ty {
                        self
                    }
                }

                impl Built<$ty> for Result<$ty, BuildError> {
                    fn built(self) -> $ty {
                        self.unwrap()
                    }
                }
            )*
        };
    }

    built!(
        AmazonopensearchserviceDestinationDescription,
        BufferingHints,
        DeliveryStreamDescription,
        DestinationDescription,
        EncryptionConfiguration,
        ExtendedS3DestinationDescription,
        ProcessingConfiguration,
        Processor,
        ProcessorParameter,
        S3DestinationDescription,
    );

    fn processor(lambda: &str) -> Processor {
        Processor::builder()
            .r#type(ProcessorType::Lambda)
            .parameters(
                ProcessorParameter::builder()
                    .parameter_name(ProcessorParameterName::LambdaArn)
                    .parameter_value(lambda)
                    .build()
                    .built(),
            )
            .build()
            .built()
    }

    fn s3_description(bucket: &str, compression: CompressionFormat) -> S3DestinationDescription {
        S3DestinationDescription::builder()
            .role_arn("arn:aws:iam::123456789012:role/firehose")
            .bucket_arn(bucket)
            .buffering_hints(BufferingHints::builder().size_in_mbs(5).build().built())
            .compression_format(compression)
            .encryption_configuration(
                EncryptionConfiguration::builder()
                    .no_encryption_config(NoEncryptionConfig::NoEncryption)
                    .build()
                    .built(),
            )
            .build()
            .built()
    }

    fn description() -> DeliveryStreamDescription {
        let extended_s3 = ExtendedS3DestinationDescription::builder()
            .role_arn("arn:aws:iam::123456789012:role/firehose")
            .bucket_arn("bucket")
            .buffering_hints(
                BufferingHints::builder()
                    .interval_in_seconds(300)
                    .size_in_mbs(5)
                    .build()
                    .built(),
            )
            .compression_format(CompressionFormat::Gzip)
            .encryption_configuration(
                EncryptionConfiguration::builder()
                    .no_encryption_config(NoEncryptionConfig::NoEncryption)
                    .build()
                    .built(),
            )
            .processing_configuration(
                ProcessingConfiguration::builder()
                    .enabled(true)
                    .processors(processor("arn:aws:lambda:eu-west-1:123456789012:function:a"))
                    .processors(processor("arn:aws:lambda:eu-west-1:123456789012:function:b"))
                    .build()
                    .built(),
            )
            .s3_backup_description(s3_description("backup", CompressionFormat::Uncompressed))
            .build()
            .built();

        let open_search = AmazonopensearchserviceDestinationDescription::builder()
            .domain_arn("arn:aws:es:eu-west-1:123456789012:domain/logs")
            .index_name("logs")
            .build()
            .built();

        DeliveryStreamDescription::builder()
            .delivery_stream_name("orders")
            .delivery_stream_arn("arn:aws:firehose:eu-west-1:123456789012:deliverystream/orders")
            .delivery_stream_status(DeliveryStreamStatus::Active)
            .delivery_stream_type(DeliveryStreamType::DirectPut)
            .version_id("1")
            .create_timestamp(DateTime::from_secs(1_672_912_800))
            .destinations(
                DestinationDescription::builder()
                    .destination_id("destinationId-000000000001")
                    .extended_s3_destination_description(extended_s3)
                    .build()
                    .built(),
            )
            .destinations(
                DestinationDescription::builder()
                    .destination_id("destinationId-000000000002")
                    .amazonopensearchservice_destination_description(open_search)
                    .build()
                    .built(),
            )
            .has_more_destinations(false)
            .build()
            .built()
    }

    #[test]
    fn decoded_descriptions_fill_the_delivery_stream_tables() {
        let schema = firehose::schema().unwrap();
        let context = Context::new("123456789012", "eu-west-1");
        let record = decode(&description());

        let resource = Materializer::new(&schema, &context).materialize("orders", &record);
        assert_eq!(resource.rows().len(), 7);
        assert_eq!(resource.rows_of(firehose::EXTENDED_S3_DESTINATIONS).count(), 1);
        assert_eq!(resource.rows_of(firehose::EXTENDED_S3_PROCESSORS).count(), 2);
        assert_eq!(
            resource
                .rows_of(firehose::EXTENDED_S3_PROCESSOR_PARAMETERS)
                .count(),
            2
        );
        assert_eq!(resource.rows_of(firehose::OPEN_SEARCH_DESTINATIONS).count(), 1);

        let root = resource.root().unwrap();
        assert_eq!(root.get("delivery_stream_name"), Some(&Datum::String("orders".into())));
        assert_eq!(root.get("delivery_stream_status"), Some(&Datum::String("ACTIVE".into())));
        assert!(matches!(root.get("create_timestamp"), Some(Datum::Timestamp(_))));

        let s3 = resource
            .rows_of(firehose::EXTENDED_S3_DESTINATIONS)
            .next()
            .unwrap();
        assert_eq!(s3.get("bucket_arn"), Some(&Datum::String("bucket".into())));
        assert_eq!(s3.get("s3_backup_bucket_arn"), Some(&Datum::String("backup".into())));
        assert_eq!(s3.get("compression_format"), Some(&Datum::String("GZIP".into())));
        assert_eq!(s3.get("buffering_hints_interval_in_seconds"), Some(&Datum::BigInt(300)));

        let parameter = resource
            .rows_of(firehose::EXTENDED_S3_PROCESSOR_PARAMETERS)
            .next()
            .unwrap();
        assert_eq!(
            parameter.get("parameter_name"),
            Some(&Datum::String("LambdaArn".into()))
        );

        let open_search = resource
            .rows_of(firehose::OPEN_SEARCH_DESTINATIONS)
            .next()
            .unwrap();
        assert_eq!(open_search.get("index_name"), Some(&Datum::String("logs".into())));
        assert_eq!(
            open_search.get("domain_arn"),
            Some(&Datum::String(
                "arn:aws:es:eu-west-1:123456789012:domain/logs".into()
            ))
        );
    }

    #[test]
    fn enums_use_their_wire_string() {
        assert_eq!(CompressionFormat::Gzip.to_value(), json!("GZIP"));
        assert_eq!(DeliveryStreamStatus::Active.to_value(), json!("ACTIVE"));
    }
}
