//! Tables for Kinesis Firehose delivery streams.
//!
//! ```text
//! aws_kinesis_firehoses
//! ├── aws_kinesis_firehose_open_search_destination
//! │   └── aws_kinesis_firehose_open_search_destination_processors
//! │       └── aws_kinesis_firehose_open_search_destination_processor_parameters
//! └── aws_kinesis_firehose_extended_s3_destination
//!     └── aws_kinesis_firehose_extended_s3_destination_processors
//!         └── aws_kinesis_firehose_extended_s3_destination_processor_parameters
//! ```

use super::{
    Column,
    ColumnType::{BigInt, Bool, Float, Json, String as Text, StringArray, Timestamp},
    ContextField, Schema, TableBuilder,
};
use crate::{error::Error, path};

use serde_json::Value;

pub const FIREHOSES: &str = "aws_kinesis_firehoses";
pub const OPEN_SEARCH_DESTINATIONS: &str = "aws_kinesis_firehose_open_search_destination";
pub const OPEN_SEARCH_PROCESSORS: &str = "aws_kinesis_firehose_open_search_destination_processors";
pub const OPEN_SEARCH_PROCESSOR_PARAMETERS: &str =
    "aws_kinesis_firehose_open_search_destination_processor_parameters";
pub const EXTENDED_S3_DESTINATIONS: &str = "aws_kinesis_firehose_extended_s3_destination";
pub const EXTENDED_S3_PROCESSORS: &str = "aws_kinesis_firehose_extended_s3_destination_processors";
pub const EXTENDED_S3_PROCESSOR_PARAMETERS: &str =
    "aws_kinesis_firehose_extended_s3_destination_processor_parameters";

const PROCESSORS_PATH: &str = "ProcessingConfiguration.Processors";

/// The full delivery stream schema.
pub fn schema() -> Result<Schema, Error> {
    firehoses().build()
}

fn firehoses() -> TableBuilder {
    TableBuilder::new(FIREHOSES)
        .primary_keys(["arn"])
        .columns([
            Column::context("account_id", ContextField::AccountId),
            Column::context("region", ContextField::Region),
            Column::tags("tags"),
            Column::path("arn", Text, "DeliveryStreamARN"),
            Column::path("delivery_stream_arn", Text, "DeliveryStreamARN"),
            Column::new("delivery_stream_name", Text),
            Column::new("delivery_stream_status", Text),
            Column::new("delivery_stream_type", Text),
            Column::new("version_id", Text),
            Column::new("create_timestamp", Timestamp),
            Column::path(
                "encryption_config_failure_description_details",
                Text,
                "DeliveryStreamEncryptionConfiguration.FailureDescription.Details",
            ),
            Column::path(
                "encryption_config_failure_description_type",
                Text,
                "DeliveryStreamEncryptionConfiguration.FailureDescription.Type",
            ),
            Column::path(
                "encryption_config_key_arn",
                Text,
                "DeliveryStreamEncryptionConfiguration.KeyARN",
            ),
            Column::path(
                "encryption_config_key_type",
                Text,
                "DeliveryStreamEncryptionConfiguration.KeyType",
            ),
            Column::path(
                "encryption_config_status",
                Text,
                "DeliveryStreamEncryptionConfiguration.Status",
            ),
            Column::path("failure_description_details", Text, "FailureDescription.Details"),
            Column::path("failure_description_type", Text, "FailureDescription.Type"),
            Column::new("last_update_timestamp", Timestamp),
            Column::path(
                "source_kinesis_stream_delivery_start_timestamp",
                Timestamp,
                "Source.KinesisStreamSourceDescription.DeliveryStartTimestamp",
            ),
            Column::path(
                "source_kinesis_stream_kinesis_stream_arn",
                Text,
                "Source.KinesisStreamSourceDescription.KinesisStreamARN",
            ),
            Column::path(
                "source_kinesis_stream_role_arn",
                Text,
                "Source.KinesisStreamSourceDescription.RoleARN",
            ),
        ])
        .relation(
            "Destinations.AmazonopensearchserviceDestinationDescription",
            open_search_destination(),
        )
        .relation(
            "Destinations.ExtendedS3DestinationDescription",
            extended_s3_destination(),
        )
}

fn open_search_destination() -> TableBuilder {
    TableBuilder::new(OPEN_SEARCH_DESTINATIONS)
        .parent_key("firehose_cq_id")
        .columns([
            Column::custom("processing_configuration_processors", Json, processors_json),
            Column::path(
                "buffering_hints_interval_in_seconds",
                BigInt,
                "BufferingHints.IntervalInSeconds",
            ),
            Column::path("buffering_hints_size_in_mb_s", BigInt, "BufferingHints.SizeInMBs"),
            Column::path(
                "cloud_watch_logging_options_enabled",
                Bool,
                "CloudWatchLoggingOptions.Enabled",
            ),
            Column::path(
                "cloud_watch_logging_options_log_group_name",
                Text,
                "CloudWatchLoggingOptions.LogGroupName",
            ),
            Column::path(
                "cloud_watch_logging_options_log_stream_name",
                Text,
                "CloudWatchLoggingOptions.LogStreamName",
            ),
            Column::new("cluster_endpoint", Text),
            Column::path("domain_arn", Text, "DomainARN"),
            Column::new("index_name", Text),
            Column::new("index_rotation_period", Text),
            Column::path(
                "processing_configuration_enabled",
                Bool,
                "ProcessingConfiguration.Enabled",
            ),
            Column::path(
                "retry_options_duration_in_seconds",
                BigInt,
                "RetryOptions.DurationInSeconds",
            ),
            Column::path("role_arn", Text, "RoleARN"),
            Column::new("s3_backup_mode", Text),
        ])
        .columns(s3_description_columns("s3_destination", "S3DestinationDescription"))
        .columns([
            Column::new("type_name", Text),
            Column::path(
                "vpc_configuration_description_role_arn",
                Text,
                "VpcConfigurationDescription.RoleARN",
            ),
            Column::path(
                "vpc_configuration_description_security_group_ids",
                StringArray,
                "VpcConfigurationDescription.SecurityGroupIds",
            ),
            Column::path(
                "vpc_configuration_description_subnet_ids",
                StringArray,
                "VpcConfigurationDescription.SubnetIds",
            ),
            Column::path(
                "vpc_configuration_description_vpc_id",
                Text,
                "VpcConfigurationDescription.VpcId",
            ),
        ])
        .relation(
            PROCESSORS_PATH,
            processors(OPEN_SEARCH_PROCESSORS, OPEN_SEARCH_PROCESSOR_PARAMETERS)
                .parent_key("open_search_destination_cq_id"),
        )
}

fn extended_s3_destination() -> TableBuilder {
    const SERIALIZER: &str = "DataFormatConversionConfiguration.OutputFormatConfiguration.Serializer";
    const DESERIALIZER: &str =
        "DataFormatConversionConfiguration.InputFormatConfiguration.Deserializer";
    const SCHEMA: &str = "DataFormatConversionConfiguration.SchemaConfiguration";

    let orc = |name: &str, column_type, field: &str| {
        Column::path(
            format!("serializer_orc_ser_de_{name}"),
            column_type,
            format!("{SERIALIZER}.OrcSerDe.{field}"),
        )
    };
    let parquet = |name: &str, column_type, field: &str| {
        Column::path(
            format!("serializer_parquet_ser_de_{name}"),
            column_type,
            format!("{SERIALIZER}.ParquetSerDe.{field}"),
        )
    };
    let schema_config = |name: &str, field: &str| {
        Column::path(
            format!("schema_configuration_{name}"),
            Text,
            format!("{SCHEMA}.{field}"),
        )
    };

    TableBuilder::new(EXTENDED_S3_DESTINATIONS)
        .parent_key("firehose_cq_id")
        .columns([
            Column::custom("processing_configuration_processors", Json, processors_json),
            Column::path("bucket_arn", Text, "BucketARN"),
            Column::path(
                "buffering_hints_interval_in_seconds",
                BigInt,
                "BufferingHints.IntervalInSeconds",
            ),
            Column::path("buffering_hints_size_in_mb_s", BigInt, "BufferingHints.SizeInMBs"),
            Column::new("compression_format", Text),
            Column::path(
                "encryption_configuration_kms_encryption_config_aws_kms_key_arn",
                Text,
                "EncryptionConfiguration.KMSEncryptionConfig.AWSKMSKeyARN",
            ),
            Column::path(
                "encryption_configuration_no_encryption_config",
                Text,
                "EncryptionConfiguration.NoEncryptionConfig",
            ),
            Column::path("role_arn", Text, "RoleARN"),
            Column::path(
                "cloud_watch_logging_options_enabled",
                Bool,
                "CloudWatchLoggingOptions.Enabled",
            ),
            Column::path(
                "cloud_watch_logging_options_log_group_name",
                Text,
                "CloudWatchLoggingOptions.LogGroupName",
            ),
            Column::path(
                "cloud_watch_logging_options_log_stream_name",
                Text,
                "CloudWatchLoggingOptions.LogStreamName",
            ),
            Column::path("enabled", Bool, "DataFormatConversionConfiguration.Enabled"),
            Column::path(
                "deserializer_hive_json_ser_de_timestamp_formats",
                StringArray,
                format!("{DESERIALIZER}.HiveJsonSerDe.TimestampFormats"),
            ),
            Column::path(
                "deserializer_open_x_json_ser_de_case_insensitive",
                Bool,
                format!("{DESERIALIZER}.OpenXJsonSerDe.CaseInsensitive"),
            ),
            Column::path(
                "deserializer_open_x_json_ser_de_column_to_json_key_mappings",
                Json,
                format!("{DESERIALIZER}.OpenXJsonSerDe.ColumnToJsonKeyMappings"),
            ),
            Column::path(
                "deserializer_open_x_json_ser_de_convert_dots_in_json_keys_to_underscores",
                Bool,
                format!("{DESERIALIZER}.OpenXJsonSerDe.ConvertDotsInJsonKeysToUnderscores"),
            ),
            orc("block_size_bytes", BigInt, "BlockSizeBytes"),
            orc("bloom_filter_columns", StringArray, "BloomFilterColumns"),
            orc(
                "bloom_filter_false_positive_probability",
                Float,
                "BloomFilterFalsePositiveProbability",
            ),
            orc("compression", Text, "Compression"),
            orc("dictionary_key_threshold", Float, "DictionaryKeyThreshold"),
            orc("enable_padding", Bool, "EnablePadding"),
            orc("format_version", Text, "FormatVersion"),
            orc("padding_tolerance", Float, "PaddingTolerance"),
            orc("row_index_stride", BigInt, "RowIndexStride"),
            orc("stripe_size_bytes", BigInt, "StripeSizeBytes"),
            parquet("block_size_bytes", BigInt, "BlockSizeBytes"),
            parquet("compression", Text, "Compression"),
            parquet(
                "enable_dictionary_compression",
                Bool,
                "EnableDictionaryCompression",
            ),
            parquet("max_padding_bytes", BigInt, "MaxPaddingBytes"),
            parquet("page_size_bytes", BigInt, "PageSizeBytes"),
            parquet("writer_version", Text, "WriterVersion"),
            schema_config("catalog_id", "CatalogId"),
            schema_config("database_name", "DatabaseName"),
            schema_config("region", "Region"),
            schema_config("role_arn", "RoleARN"),
            schema_config("table_name", "TableName"),
            schema_config("version_id", "VersionId"),
            Column::path(
                "dynamic_partitioning_configuration_enabled",
                Bool,
                "DynamicPartitioningConfiguration.Enabled",
            ),
            Column::path(
                "dynamic_partitioning_configuration_retry_options_duration_in_seconds",
                BigInt,
                "DynamicPartitioningConfiguration.RetryOptions.DurationInSeconds",
            ),
            Column::new("error_output_prefix", Text),
            Column::new("prefix", Text),
            Column::path(
                "processing_configuration_enabled",
                Bool,
                "ProcessingConfiguration.Enabled",
            ),
        ])
        .columns(s3_description_columns("s3_backup", "S3BackupDescription"))
        .column(Column::new("s3_backup_mode", Text))
        .relation(
            PROCESSORS_PATH,
            processors(EXTENDED_S3_PROCESSORS, EXTENDED_S3_PROCESSOR_PARAMETERS)
                .parent_key("extended_s3_destination_cq_id"),
        )
}

fn processors(table: &str, parameters_table: &str) -> TableBuilder {
    TableBuilder::new(table)
        .column(Column::new("type", Text))
        .relation(
            "Parameters",
            TableBuilder::new(parameters_table)
                .parent_key("processor_cq_id")
                .columns([
                    Column::new("parameter_name", Text),
                    Column::new("parameter_value", Text),
                ]),
        )
}

/// Columns of an embedded S3 destination description, named `<prefix>_<field>`.
fn s3_description_columns(prefix: &str, root: &str) -> Vec<Column> {
    [
        ("bucket_arn", Text, "BucketARN"),
        ("buffering_hints_interval_in_seconds", BigInt, "BufferingHints.IntervalInSeconds"),
        ("buffering_hints_size_in_mb_s", BigInt, "BufferingHints.SizeInMBs"),
        ("compression_format", Text, "CompressionFormat"),
        (
            "kms_encryption_config_aws_kms_key_arn",
            Text,
            "EncryptionConfiguration.KMSEncryptionConfig.AWSKMSKeyARN",
        ),
        (
            "no_encryption_config",
            Text,
            "EncryptionConfiguration.NoEncryptionConfig",
        ),
        ("role_arn", Text, "RoleARN"),
        (
            "cloud_watch_logging_options_enabled",
            Bool,
            "CloudWatchLoggingOptions.Enabled",
        ),
        (
            "cloud_watch_logging_options_log_group_name",
            Text,
            "CloudWatchLoggingOptions.LogGroupName",
        ),
        (
            "cloud_watch_logging_options_log_stream_name",
            Text,
            "CloudWatchLoggingOptions.LogStreamName",
        ),
        ("error_output_prefix", Text, "ErrorOutputPrefix"),
        ("prefix", Text, "Prefix"),
    ]
    .into_iter()
    .map(|(name, column_type, field)| {
        Column::path(format!("{prefix}_{name}"), column_type, format!("{root}.{field}"))
    })
    .collect()
}

/// The raw processor list of a destination, kept as one JSON value.
fn processors_json(record: &Value) -> Option<Value> {
    path::resolve(record, PROCESSORS_PATH)
}
